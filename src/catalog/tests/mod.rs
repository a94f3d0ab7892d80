//! Тесты модели и загрузчика каталога

pub mod loader_tests;
pub mod snapshot_tests;
