//! Тесты грамматик аннотаций

pub mod ident_tests;
