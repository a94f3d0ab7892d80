//! Тесты проверки совместимости типов

pub mod resolver_tests;
