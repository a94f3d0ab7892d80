//! Поведение при конфликте вставки

use crate::grammar::IdentifierList;
use serde::Serialize;

/// Цель конфликта: колонки, индекс или ограничение (не более одной)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConflictTarget {
    /// Набор колонок, совпадающий с ключом уникального индекса
    Columns(Vec<String>),
    /// Именованный индекс
    Index(String),
    /// Именованное ограничение
    Constraint(String),
}

/// Действие при конфликте (ровно одно)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConflictAction {
    /// Игнорировать конфликтующую строку
    Ignore,
    /// Обновить перечисленные колонки
    Update(IdentifierList),
}

/// Секция on-conflict цели вставки
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnConflictClause {
    pub target: Option<ConflictTarget>,
    pub action: ConflictAction,
}
