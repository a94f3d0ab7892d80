//! План запроса - результат семантической проверки
//!
//! Каждый узел плана несет разрешенную колонку каталога и имена
//! выбранных процедур преобразования; генератор кода потребляет план
//! как есть, без повторных обращений к каталогу.

use crate::catalog::relation::{Column, Relation};
use crate::descriptor::{QueryKind, TypeInfo};
use crate::grammar::{Predicate, Quantifier, RelationIdentifier};
use crate::ir::{BooleanLinker, Directives, JoinKind, NullsPosition, SelectorStep, SortDirection};
use serde::Serialize;
use std::sync::Arc;

/// Поле плана с разрешенной колонкой и процедурами преобразования
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedField {
    /// Имя поля записи
    pub field_name: String,
    /// Цепочка селекторов вложенного поля
    pub selector: Vec<SelectorStep>,
    /// Разрешенная колонка каталога
    pub column: Column,
    /// Процедура на стороне записи (пустая строка - без преобразования)
    pub valuer: String,
    /// Процедура на стороне чтения
    pub scanner: String,
    /// Заменять NULL значением по умолчанию типа
    pub coalesce_null: bool,
    /// Использовать значение по умолчанию колонки
    pub use_default: bool,
    /// Принудительная запись
    pub force_write: bool,
}

/// Операнд условия после разрешения
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlannedOperand {
    /// Значение поля записи
    Field {
        field_name: String,
        type_info: TypeInfo,
    },
    /// Колонка другого отношения
    Column { relation: String, column: Column },
    /// Литеральное выражение
    Literal(String),
}

/// Условие с разрешенной колонкой
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedCondition {
    /// Ключ отношения в пространстве цели
    pub relation: String,
    /// Разрешенная колонка левого операнда
    pub column: Column,
    pub predicate: Predicate,
    pub quantifier: Option<Quantifier>,
    /// Правый операнд; отсутствует у унарных предикатов
    pub operand: Option<PlannedOperand>,
}

/// Интервальное условие с разрешенной колонкой
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedBetween {
    pub relation: String,
    pub column: Column,
    pub symmetric: bool,
    pub negated: bool,
    pub lower_field: String,
    pub upper_field: String,
}

/// Узел дерева условий плана
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlannedWhereItem {
    Linker(BooleanLinker),
    Condition(PlannedCondition),
    Between(PlannedBetween),
    Group(Vec<PlannedWhereItem>),
}

/// Элемент условий соединения плана
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlannedJoinItem {
    Linker(BooleanLinker),
    Condition(PlannedCondition),
}

/// Соединение плана с загруженным отношением
#[derive(Debug, Clone, Serialize)]
pub struct PlannedJoin {
    pub kind: JoinKind,
    pub relation: RelationIdentifier,
    /// Отношение каталога
    pub catalog_relation: Arc<Relation>,
    pub conditions: Vec<PlannedJoinItem>,
}

/// Элемент сортировки плана
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedOrderBy {
    pub relation: String,
    pub column: Column,
    pub direction: SortDirection,
    pub nulls: Option<NullsPosition>,
}

/// Сведения о разрешенном поведении при конфликте
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictInfo {
    /// Колонки цели конфликта
    pub target_columns: Vec<String>,
    /// Имя уникального индекса, покрывающего цель
    pub target_index: Option<String>,
    /// Имя ограничения-цели
    pub target_constraint: Option<String>,
    /// Игнорировать конфликтующую строку
    pub ignore: bool,
    /// Колонки обновления при конфликте
    pub update_columns: Vec<String>,
}

/// Итоговый план запроса одной цели
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    /// Имя цели
    pub target: String,
    /// Вид запроса
    pub kind: QueryKind,
    /// Идентификатор целевого отношения
    pub relation: RelationIdentifier,
    /// Целевое отношение каталога
    pub catalog_relation: Arc<Relation>,
    /// Читаемые поля
    pub reads: Vec<PlannedField>,
    /// Записываемые поля
    pub writes: Vec<PlannedField>,
    /// Поля-фильтры
    pub filters: Vec<PlannedField>,
    /// Записываемые поля первичного ключа
    pub key_writes: Vec<PlannedField>,
    /// Соединения
    pub joins: Vec<PlannedJoin>,
    /// Верхнеуровневые условия отбора
    pub conditionals: Vec<PlannedWhereItem>,
    /// Поведение при конфликте вставки
    pub conflict: Option<ConflictInfo>,
    /// Сортировка
    pub order_by: Vec<PlannedOrderBy>,
    /// Директивы цели, перенесенные из IR
    pub directives: Directives,
}
