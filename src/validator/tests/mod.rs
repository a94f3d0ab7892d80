//! Тесты семантического валидатора

pub mod conflict_tests;
