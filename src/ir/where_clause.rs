//! Условия отбора строк

use crate::descriptor::{SourcePosition, TypeInfo};
use crate::grammar::{ColumnIdentifier, Predicate, Quantifier};
use serde::Serialize;
use std::fmt;

/// Логическая связка между условиями
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanLinker {
    And,
    Or,
}

impl Default for BooleanLinker {
    fn default() -> Self {
        Self::And
    }
}

impl fmt::Display for BooleanLinker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// Дерево условий одной рамки
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WhereClause {
    pub items: Vec<WhereItem>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Элемент условия
///
/// Закрытое множество форм; потребители обязаны разбирать его
/// исчерпывающим сопоставлением.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WhereItem {
    /// Логическая связка между соседними условиями
    Linker(BooleanLinker),
    /// Сравнение колонки со значением поля
    Field(FieldCondition),
    /// Сравнение колонки с колонкой или литералом
    Column(ColumnCondition),
    /// Интервальное условие с двумя полями-границами
    Between(BetweenCondition),
    /// Вложенная группа условий
    Group(WhereClause),
}

/// Условие, операндом которого служит значение поля
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCondition {
    /// Колонка левого операнда
    pub column: ColumnIdentifier,
    /// Предикат
    pub predicate: Predicate,
    /// Квантификатор
    pub quantifier: Option<Quantifier>,
    /// Имя поля-операнда
    pub field_name: String,
    /// Тип поля-операнда
    pub type_info: TypeInfo,
    /// Позиция поля
    pub position: Option<SourcePosition>,
}

/// Правый операнд колоночного условия
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConditionOperand {
    /// Другая колонка
    Column(ColumnIdentifier),
    /// Литеральное выражение, передаваемое в SQL как есть
    Literal(String),
}

/// Условие между колонкой и колонкой/литералом
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCondition {
    pub left: ColumnIdentifier,
    pub predicate: Predicate,
    pub quantifier: Option<Quantifier>,
    pub right: Option<ConditionOperand>,
}

/// Поле-граница интервального условия
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundField {
    pub field_name: String,
    pub type_info: TypeInfo,
}

/// Интервальное условие
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetweenCondition {
    /// Проверяемая колонка
    pub column: ColumnIdentifier,
    /// Симметричная форма
    pub symmetric: bool,
    /// Отрицание
    pub negated: bool,
    /// Нижняя граница
    pub lower: BoundField,
    /// Верхняя граница
    pub upper: BoundField,
    /// Позиция поля
    pub position: Option<SourcePosition>,
}
