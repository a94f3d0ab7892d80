//! Промежуточное представление запроса (Query IR)
//!
//! Строится структурным анализатором за один проход по дескриптору цели
//! и затем только читается семантическим валидатором. Каждый экземпляр
//! принадлежит ровно одному прогону анализа.

pub mod conflict;
pub mod directives;
pub mod join_clause;
pub mod where_clause;

pub use conflict::{ConflictAction, ConflictTarget, OnConflictClause};
pub use directives::{
    DirectiveField, Directives, NullsPosition, OrderByItem, OverrideKind, SortDirection,
};
pub use join_clause::{JoinClause, JoinDirective, JoinItem, JoinKind};
pub use where_clause::{
    BetweenCondition, BooleanLinker, BoundField, ColumnCondition, ConditionOperand,
    FieldCondition, WhereClause, WhereItem,
};

use crate::descriptor::{QueryKind, SourcePosition, TypeInfo};
use crate::grammar::{ColumnIdentifier, RelationIdentifier};
use serde::Serialize;
use std::sync::Arc;

/// Поле цели, задающее отношение и тип записи
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationField {
    /// Имя поля в дескрипторе
    pub field_name: String,
    /// Идентификатор отношения
    pub relation: RelationIdentifier,
    /// Разобранный тип записи
    pub relation_type: RelationType,
}

/// Тип записи отношения после классификации
///
/// Ровно одна из форм: итератор, последовательность или
/// обычная (возможно опциональная) запись.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationType {
    /// Имя базовой записи
    pub base_name: String,
    /// Последовательность записей
    pub sequence: bool,
    /// Фиксированная длина последовательности
    pub fixed_len: Option<u32>,
    /// Опциональная запись
    pub optional: bool,
    /// Итераторная форма (обратный вызов на каждую запись)
    pub iterator: bool,
    /// Развернутый список полей записи
    pub fields: Arc<Vec<IrField>>,
}

/// Одно поле записи отношения после развертки
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrField {
    /// Идентификатор колонки
    pub column: ColumnIdentifier,
    /// Имя поля в записи
    pub field_name: String,
    /// Тип поля
    pub type_info: TypeInfo,
    /// Поле участвует в чтении из колонки
    pub readable: bool,
    /// Поле участвует в записи в колонку
    pub writable: bool,
    /// Поле может использоваться в фильтрах
    pub filterable: bool,
    /// Цепочка селекторов для вложенных полей
    pub selector: Vec<SelectorStep>,
    /// Заменять NULL значением по умолчанию типа
    pub coalesce_null: bool,
    /// Использовать значение по умолчанию колонки
    pub use_default: bool,
    /// Принудительная запись
    pub force_write: bool,
    /// Позиция поля в исходном тексте
    pub position: Option<SourcePosition>,
}

/// Шаг цепочки селекторов: путь родительских полей
/// для вложенных ("спущенных") дескрипторов
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorStep {
    /// Имя родительского поля
    pub field: String,
    /// Имя типа родительского поля
    pub type_name: String,
    /// Родительское поле опционально
    pub optional: bool,
}

/// Промежуточное представление одной цели
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryIr {
    /// Имя цели
    pub target: String,
    /// Вид запроса
    pub kind: QueryKind,
    /// Поле отношения (обязательное)
    pub relation: RelationField,
    /// Условия отбора строк
    pub where_clause: Option<WhereClause>,
    /// Соединения
    pub join_clause: Option<JoinClause>,
    /// Поведение при конфликте вставки
    pub on_conflict: Option<OnConflictClause>,
    /// Директивы
    pub directives: Directives,
}
