//! Семантическая проверка и сборка плана запроса
//!
//! Валидатор потребляет промежуточное представление, построенное
//! структурным анализатором, сверяет каждый узел с моделью каталога
//! и собирает план запроса для генератора кода.

pub mod plan;
pub mod semantic_validator;

#[cfg(test)]
pub mod tests;

// Переэкспортируем основные типы
pub use plan::{
    ConflictInfo, PlannedBetween, PlannedCondition, PlannedField, PlannedJoin, PlannedJoinItem,
    PlannedOperand, PlannedOrderBy, PlannedWhereItem, QueryPlan,
};
pub use semantic_validator::SemanticValidator;
