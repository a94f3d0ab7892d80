//! Конфигурация для sqlplan
//!
//! Предоставляет структуры конфигурации для анализатора и загрузчика каталога

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Основная конфигурация анализатора
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Параметры подключения к базе данных
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Параметры анализа
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Уровень логирования (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Параметры подключения к базе данных
///
/// Загрузчик каталога использует только идентичность подключения;
/// само соединение предоставляется вызывающей стороной.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Хост базы данных
    pub host: String,
    /// Порт базы данных
    pub port: u16,
    /// Имя базы данных
    pub database: String,
    /// Имя пользователя
    pub user: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Ключ идентичности подключения для кэша моделей каталога
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}/{}@{}",
            self.host, self.port, self.database, self.user
        )
    }
}

/// Параметры анализа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Включить кэширование разобранных типов отношений
    pub enable_type_cache: bool,
    /// Максимальная глубина обхода вложенных дескрипторов
    pub max_walk_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enable_type_cache: true,
            max_walk_depth: 32,
        }
    }
}

impl Config {
    /// Загружает конфигурацию из TOML файла
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::configuration(format!("cannot parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.port, 5432);
        assert!(config.analyzer.enable_type_cache);
        assert_eq!(config.analyzer.max_walk_depth, 32);
    }

    #[test]
    fn test_connection_cache_key() {
        let conn = ConnectionConfig::default();
        assert_eq!(conn.cache_key(), "localhost:5432/postgres@postgres");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[connection]\nhost = \"db.local\"\nport = 6432\ndatabase = \"shop\"\nuser = \"app\"\n\n[analyzer]\nenable_type_cache = false\nmax_walk_depth = 8"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.connection.host, "db.local");
        assert_eq!(config.connection.port, 6432);
        assert!(!config.analyzer.enable_type_cache);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[[").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
