//! Тесты структурного анализатора

pub mod join_tests;
pub mod relation_space_tests;
pub mod where_tests;
