//! Общие типы и утилиты sqlplan

pub mod config;
pub mod error;
pub mod test_utils;

pub use config::{AnalyzerConfig, Config, ConnectionConfig};
pub use error::{Error, ErrorDetails, Result};
