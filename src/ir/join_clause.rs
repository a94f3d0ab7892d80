//! Соединения отношений

use crate::grammar::RelationIdentifier;
use crate::ir::where_clause::{BooleanLinker, ColumnCondition};
use serde::Serialize;
use std::fmt;

/// Вид соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Разбирает вид соединения из значения аннотации
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "cross" => Some(Self::Cross),
            "inner" => Some(Self::Inner),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Cross => "cross",
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Full => "full",
        };
        write!(f, "{}", text)
    }
}

/// Элемент списка условий соединения
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JoinItem {
    /// Логическая связка
    Linker(BooleanLinker),
    /// Колоночное условие
    Condition(ColumnCondition),
}

/// Одна директива соединения
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinDirective {
    /// Вид соединения
    pub kind: JoinKind,
    /// Присоединяемое отношение
    pub relation: RelationIdentifier,
    /// Условия соединения
    pub conditions: Vec<JoinItem>,
}

/// Секция соединений цели
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JoinClause {
    /// Явное базовое отношение (директива `from`)
    pub base: Option<RelationIdentifier>,
    /// Упорядоченные директивы соединения
    pub directives: Vec<JoinDirective>,
}
