//! Директивы цели: ограничители выборки, сортировка, списки колонок,
//! выходные дескрипторы

use crate::descriptor::TypeInfo;
use crate::grammar::{ColumnIdentifier, IdentifierList};
use serde::Serialize;

/// Направление сортировки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Положение NULL значений при сортировке
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsPosition {
    First,
    Last,
}

/// Элемент сортировки
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub column: ColumnIdentifier,
    pub direction: SortDirection,
    pub nulls: Option<NullsPosition>,
}

/// Источник генерируемых значений при вставке
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideKind {
    System,
    User,
}

impl OverrideKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Ссылка на поле-директиву дескриптора
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveField {
    pub field_name: String,
    pub type_info: TypeInfo,
}

/// Собранные директивы цели
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Directives {
    /// Ограничение количества строк
    pub limit: Option<DirectiveField>,
    /// Смещение выборки
    pub offset: Option<DirectiveField>,
    /// Сортировка
    pub order_by: Vec<OrderByItem>,
    /// Возвращаемые колонки
    pub returning: Option<IdentifierList>,
    /// Колонки со значением по умолчанию
    pub default_columns: Option<IdentifierList>,
    /// Колонки принудительной записи
    pub force_columns: Option<IdentifierList>,
    /// Опциональные колонки
    pub optional_columns: Option<IdentifierList>,
    /// Источник генерируемых значений
    pub override_kind: Option<OverrideKind>,
    /// Выборка всех строк без условий
    pub all_rows: bool,
    /// Выходной дескриптор результата
    pub result: Option<DirectiveField>,
    /// Счетчик затронутых строк
    pub rows_affected: Option<DirectiveField>,
    /// Обработчик ошибок
    pub error_handler: Option<DirectiveField>,
    /// Внешний текстовый фильтр
    pub filter: Option<DirectiveField>,
    /// Контекст выполнения
    pub context: Option<DirectiveField>,
}
