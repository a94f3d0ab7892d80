//! Проверка совместимости типов
//!
//! Этот модуль определяет структурные отпечатки типов приложения,
//! предвычисленную таблицу совместимости с процедурами преобразования
//! и разрешитель, сверяющий пары поле-колонка и операнды предикатов
//! с моделью каталога.

pub mod compatibility;
pub mod literal;
pub mod resolver;

#[cfg(test)]
pub mod tests;

// Переэкспортируем основные типы
pub use compatibility::Conversion;
pub use literal::{literal_shape, natural_element_oid, natural_oid};
pub use resolver::CompatibilityResolver;
