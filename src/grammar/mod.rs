//! Грамматики встроенных мини-языков аннотаций
//!
//! Чистые функции разбора: идентификаторы отношений и колонок,
//! выражения предикатов и списки идентификаторов. Единственным внешним
//! состоянием для них служит пространство отношений цели.

pub mod ident;
pub mod list;
pub mod predicate;

#[cfg(test)]
pub mod tests;

pub use ident::{
    is_identifier, is_reserved_word, parse_column_identifier, parse_relation_identifier,
    ColumnIdentifier, RelationIdentifier,
};
pub use list::{parse_identifier_list, IdentifierList};
pub use predicate::{parse_predicate, ParsedPredicate, Predicate, Quantifier};
