//! Входная модель дескрипторов целей
//!
//! Дескрипторы извлекаются из исходного кода внешним коллаборатором и
//! поступают сюда готовыми тройками {имя, тип, аннотации}. Анализатор
//! только читает их.

pub mod type_info;

pub use type_info::{AbstractMethod, TypeInfo, TypeKind};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Позиция поля в исходном тексте
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Вид запроса, выводимый из префикса имени цели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Insert,
    Update,
    Select,
    Delete,
    Filter,
}

impl QueryKind {
    /// Определяет вид запроса по префиксу имени цели
    pub fn from_target_name(name: &str) -> Option<Self> {
        if name.starts_with("Insert") {
            Some(Self::Insert)
        } else if name.starts_with("Update") {
            Some(Self::Update)
        } else if name.starts_with("Select") {
            Some(Self::Select)
        } else if name.starts_with("Delete") {
            Some(Self::Delete)
        } else if name.starts_with("Filter") {
            Some(Self::Filter)
        } else {
            None
        }
    }

    /// Допускает ли вид запроса выборочные директивы (limit, offset, order by)
    pub fn is_select_family(&self) -> bool {
        matches!(self, Self::Select)
    }

    /// Допускает ли вид запроса квалификаторы строк (where, filter, all)
    pub fn supports_row_qualifiers(&self) -> bool {
        matches!(self, Self::Select | Self::Update | Self::Delete)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Select => "select",
            Self::Delete => "delete",
            Self::Filter => "filter",
        };
        write!(f, "{}", name)
    }
}

/// Дескриптор одного поля цели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Имя поля
    pub name: String,
    /// Описание типа поля
    pub type_info: TypeInfo,
    /// Аннотации: ключ -> упорядоченный список значений
    #[serde(default)]
    pub annotations: IndexMap<String, Vec<String>>,
    /// Экспортируемое поле
    #[serde(default)]
    pub exported: bool,
    /// Встроенное (анонимное) поле
    #[serde(default)]
    pub embedded: bool,
    /// Позиция в исходном тексте
    #[serde(default)]
    pub position: Option<SourcePosition>,
}

impl FieldDescriptor {
    /// Значения аннотации по ключу
    pub fn annotation(&self, key: &str) -> Option<&[String]> {
        self.annotations.get(key).map(|v| v.as_slice())
    }

    /// Первое значение аннотации по ключу
    pub fn annotation_head(&self, key: &str) -> Option<&str> {
        self.annotation(key)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    /// Значения ключа `sql` без первого элемента (флаги)
    pub fn sql_flags(&self) -> &[String] {
        match self.annotation("sql") {
            Some(values) if values.len() > 1 => &values[1..],
            _ => &[],
        }
    }

    /// Несет ли поле указанный флаг в списке значений `sql`
    pub fn has_sql_flag(&self, flag: &str) -> bool {
        self.sql_flags().iter().any(|v| v.eq_ignore_ascii_case(flag))
    }

    /// Полный текст аннотации `sql` для сообщений об ошибках
    pub fn sql_annotation_text(&self) -> String {
        self.annotation("sql")
            .map(|values| values.join(","))
            .unwrap_or_default()
    }
}

/// Дескриптор анализируемой цели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Имя цели
    pub name: String,
    /// Упорядоченные поля
    pub fields: Vec<FieldDescriptor>,
}

impl TargetDescriptor {
    /// Вид запроса из префикса имени
    pub fn kind(&self) -> Option<QueryKind> {
        QueryKind::from_target_name(&self.name)
    }
}
