//! Записи каталога: типы, операторы, приведения, процедуры, отношения

use crate::catalog::oid::Oid;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Категория типа Postgres (pg_type.typcategory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeCategory {
    Array,
    Boolean,
    Composite,
    DateTime,
    Enum,
    Geometric,
    Network,
    Numeric,
    Pseudo,
    Range,
    String,
    Timespan,
    UserDefined,
    BitString,
    Unknown,
}

impl TypeCategory {
    /// Разбирает категорию из кода pg_type.typcategory
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => Self::Array,
            'B' => Self::Boolean,
            'C' => Self::Composite,
            'D' => Self::DateTime,
            'E' => Self::Enum,
            'G' => Self::Geometric,
            'I' => Self::Network,
            'N' => Self::Numeric,
            'P' => Self::Pseudo,
            'R' => Self::Range,
            'S' => Self::String,
            'T' => Self::Timespan,
            'U' => Self::UserDefined,
            'V' => Self::BitString,
            _ => Self::Unknown,
        }
    }
}

/// Тип данных из pg_type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgType {
    pub oid: Oid,
    pub name: String,
    pub category: TypeCategory,
    /// Тип элемента для массивов
    pub elem_oid: Option<Oid>,
}

/// Бинарный оператор из pg_operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub oid: Oid,
    pub name: String,
    pub left: Oid,
    pub right: Oid,
    pub result: Oid,
}

/// Контекст приведения типов (pg_cast.castcontext)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastContext {
    Implicit,
    Assignment,
    Explicit,
}

impl CastContext {
    pub fn from_code(code: char) -> Self {
        match code {
            'i' => Self::Implicit,
            'a' => Self::Assignment,
            _ => Self::Explicit,
        }
    }
}

/// Приведение типов из pg_cast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub source: Oid,
    pub target: Oid,
    pub context: CastContext,
}

/// Процедура с одним аргументом из pg_proc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub oid: Oid,
    pub name: String,
    pub arg: Oid,
    pub result: Oid,
}

/// Вид отношения (pg_class.relkind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    Table,
    View,
    MaterializedView,
    ForeignTable,
    PartitionedTable,
    Sequence,
    Other,
}

impl RelationKind {
    pub fn from_code(code: char) -> Self {
        match code {
            'r' => Self::Table,
            'v' => Self::View,
            'm' => Self::MaterializedView,
            'f' => Self::ForeignTable,
            'p' => Self::PartitionedTable,
            'S' => Self::Sequence,
            _ => Self::Other,
        }
    }
}

/// Колонка отношения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Порядковый номер (pg_attribute.attnum)
    pub ordinal: i16,
    pub name: String,
    pub type_oid: Oid,
    pub not_null: bool,
    pub has_default: bool,
    pub primary_key: bool,
    /// Размерность массива
    pub dimensions: i16,
}

/// Ограничение отношения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub deferrable: bool,
    /// Порядковые номера ключевых колонок
    pub key_columns: Vec<i16>,
}

/// Вид ограничения (pg_constraint.contype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Exclusion,
    Other,
}

impl ConstraintKind {
    pub fn from_code(code: char) -> Self {
        match code {
            'p' => Self::PrimaryKey,
            'u' => Self::Unique,
            'f' => Self::ForeignKey,
            'c' => Self::Check,
            'x' => Self::Exclusion,
            _ => Self::Other,
        }
    }

    /// Гарантирует ли ограничение уникальность строк
    pub fn enforces_uniqueness(&self) -> bool {
        matches!(self, Self::PrimaryKey | Self::Unique)
    }
}

/// Индекс отношения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub primary: bool,
    /// Порядковые номера ключевых колонок
    pub key_columns: Vec<i16>,
    /// Полный текст определения индекса
    pub definition: String,
    /// Выражение индекса, извлеченное из определения
    pub expression: Option<String>,
}

/// Отношение каталога с колонками, ограничениями и индексами
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub kind: RelationKind,
    /// Колонки в порядке объявления, ключ - имя колонки
    pub columns: IndexMap<String, Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
}

impl Relation {
    /// Возвращает колонку по имени
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Возвращает колонку по порядковому номеру
    pub fn column_by_ordinal(&self, ordinal: i16) -> Option<&Column> {
        self.columns.values().find(|c| c.ordinal == ordinal)
    }

    /// Колонки первичного ключа
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.values().filter(|c| c.primary_key).collect()
    }

    /// Ограничение по имени
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Индекс по имени
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Уникальный индекс, ключевые колонки которого в точности
    /// совпадают с переданным набором имен (без учета порядка)
    pub fn unique_index_matching(&self, names: &[String]) -> Option<&Index> {
        self.indexes.iter().find(|index| {
            if !index.unique || index.key_columns.len() != names.len() {
                return false;
            }
            index.key_columns.iter().all(|ordinal| {
                self.column_by_ordinal(*ordinal)
                    .map(|c| names.iter().any(|n| *n == c.name))
                    .unwrap_or(false)
            })
        })
    }
}

/// Извлекает выражение индекса из текста определения
///
/// Сканирует текст после ключевого слова метода доступа
/// (`USING <method> (...)`) с подсчетом скобок.
pub fn extract_index_expression(definition: &str) -> Option<String> {
    let lower = definition.to_ascii_lowercase();
    let using_pos = lower.find(" using ")?;
    let after_using = &definition[using_pos + " using ".len()..];

    let open = after_using.find('(')?;
    let mut depth = 0usize;
    for (offset, c) in after_using[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let inner = &after_using[open + 1..open + offset];
                    return Some(inner.trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}
