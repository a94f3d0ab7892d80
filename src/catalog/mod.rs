//! Модель и загрузчик каталога базы данных
//!
//! Этот модуль отвечает за модель системного каталога: типы,
//! операторы, приведения, процедуры и лениво подгружаемые отношения
//! с колонками, ограничениями и индексами. Модели кэшируются на
//! процесс по ключу идентичности соединения.

pub mod loader;
pub mod model;
pub mod oid;
pub mod relation;
pub mod snapshot;

#[cfg(test)]
pub mod tests;

// Переэкспортируем основные типы
pub use loader::{Catalog, CatalogAccess, CatalogConnection, CatalogRow};
pub use model::{CatalogModel, CatalogRegistry};
pub use oid::Oid;
pub use relation::{
    extract_index_expression, Cast, CastContext, Column, Constraint, ConstraintKind, Index,
    Operator, PgType, Procedure, Relation, RelationKind, TypeCategory,
};
pub use snapshot::{standard_types, CatalogSnapshot, SnapshotCatalog};
