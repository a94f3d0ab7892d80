//! Обработка ошибок для sqlplan

use crate::descriptor::SourcePosition;
use std::fmt;
use thiserror::Error;

/// Основной тип ошибки для sqlplan
#[derive(Error, Debug)]
pub enum Error {
    /// Ошибка I/O операций
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Ошибка грамматики аннотации (идентификаторы, предикаты, списки)
    #[error("Grammar error: {0}")]
    Grammar(Box<ErrorDetails>),

    /// Структурная ошибка цели (дубликаты, недопустимые поля)
    #[error("Structure error: {0}")]
    Structure(Box<ErrorDetails>),

    /// Ошибка каталога (неизвестное отношение, колонка, индекс)
    #[error("Catalog error: {0}")]
    Catalog(Box<ErrorDetails>),

    /// Ошибка совместимости типов
    #[error("Type error: {0}")]
    TypeCheck(Box<ErrorDetails>),

    /// Фатальная ошибка загрузки каталога (соединение, декодирование строк)
    #[error("Catalog load error: {message}")]
    CatalogLoad { message: String },

    /// Ошибка конфигурации
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Внутренняя ошибка
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Тип результата для sqlplan
pub type Result<T> = std::result::Result<T, Error>;

/// Структурированный контекст семантической ошибки
///
/// Заполняется в точке обнаружения, чтобы вызывающая сторона могла
/// построить диагностику без повторного восстановления контекста.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails {
    /// Текст ошибки
    pub message: String,
    /// Имя анализируемой цели
    pub target: Option<String>,
    /// Имя поля, на котором обнаружена ошибка
    pub field: Option<String>,
    /// Имя отношения в текущем контексте
    pub relation: Option<String>,
    /// Имя колонки в текущем контексте
    pub column: Option<String>,
    /// Фрагмент аннотации, вызвавший ошибку
    pub annotation: Option<String>,
    /// Позиция поля в исходном тексте
    pub position: Option<SourcePosition>,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(target) = &self.target {
            write!(f, " [target: {}", target)?;
            if let Some(field) = &self.field {
                write!(f, ", field: {}", field)?;
            }
            if let Some(relation) = &self.relation {
                write!(f, ", relation: {}", relation)?;
            }
            if let Some(column) = &self.column {
                write!(f, ", column: {}", column)?;
            }
            write!(f, "]")?;
        }
        if let Some(annotation) = &self.annotation {
            write!(f, " in annotation '{}'", annotation)?;
        }
        if let Some(position) = &self.position {
            write!(f, " at {}", position)?;
        }
        Ok(())
    }
}

impl ErrorDetails {
    /// Создает контекст ошибки из одного сообщения
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl Error {
    /// Создает ошибку грамматики
    pub fn grammar(message: impl Into<String>) -> Self {
        Self::Grammar(Box::new(ErrorDetails::new(message)))
    }

    /// Создает структурную ошибку
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure(Box::new(ErrorDetails::new(message)))
    }

    /// Создает ошибку каталога
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(Box::new(ErrorDetails::new(message)))
    }

    /// Создает ошибку совместимости типов
    pub fn type_check(message: impl Into<String>) -> Self {
        Self::TypeCheck(Box::new(ErrorDetails::new(message)))
    }

    /// Создает фатальную ошибку загрузки каталога
    pub fn catalog_load(message: impl Into<String>) -> Self {
        Self::CatalogLoad {
            message: message.into(),
        }
    }

    /// Создает ошибку конфигурации
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Создает внутреннюю ошибку
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Возвращает детали ошибки, если вариант их несет
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Grammar(d) | Self::Structure(d) | Self::Catalog(d) | Self::TypeCheck(d) => {
                Some(d.as_ref())
            }
            _ => None,
        }
    }

    /// Является ли ошибка фатальной для всего прогона
    ///
    /// Ошибки загрузки каталога означают, что модель каталога
    /// непригодна; остальные ошибки прерывают только одну цель.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CatalogLoad { .. } | Self::Io(_) | Self::Configuration { .. }
        )
    }

    /// Дополняет ошибку контекстом анализируемой цели
    pub fn with_target(self, target: &str) -> Self {
        self.map_details(|d| {
            if d.target.is_none() {
                d.target = Some(target.to_string());
            }
        })
    }

    /// Дополняет ошибку контекстом поля
    pub fn with_field(self, field: &str) -> Self {
        self.map_details(|d| {
            if d.field.is_none() {
                d.field = Some(field.to_string());
            }
        })
    }

    /// Дополняет ошибку контекстом отношения
    pub fn with_relation(self, relation: &str) -> Self {
        self.map_details(|d| {
            if d.relation.is_none() {
                d.relation = Some(relation.to_string());
            }
        })
    }

    /// Дополняет ошибку контекстом колонки
    pub fn with_column(self, column: &str) -> Self {
        self.map_details(|d| {
            if d.column.is_none() {
                d.column = Some(column.to_string());
            }
        })
    }

    /// Дополняет ошибку фрагментом аннотации
    pub fn with_annotation(self, annotation: &str) -> Self {
        self.map_details(|d| {
            if d.annotation.is_none() {
                d.annotation = Some(annotation.to_string());
            }
        })
    }

    /// Дополняет ошибку позицией в исходном тексте
    pub fn with_position(self, position: &SourcePosition) -> Self {
        self.map_details(|d| {
            if d.position.is_none() {
                d.position = Some(position.clone());
            }
        })
    }

    fn map_details(mut self, apply: impl FnOnce(&mut ErrorDetails)) -> Self {
        match &mut self {
            Self::Grammar(d) | Self::Structure(d) | Self::Catalog(d) | Self::TypeCheck(d) => {
                apply(d.as_mut())
            }
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_details_display() {
        let err = Error::catalog("unknown relation 'orders'")
            .with_target("SelectOrders")
            .with_field("meta")
            .with_relation("orders");

        let text = err.to_string();
        assert!(text.contains("unknown relation 'orders'"));
        assert!(text.contains("target: SelectOrders"));
        assert!(text.contains("field: meta"));
        assert!(text.contains("relation: orders"));
    }

    #[test]
    fn test_context_does_not_overwrite() {
        let err = Error::grammar("bad relation identifier")
            .with_target("first")
            .with_target("second");

        assert_eq!(err.details().unwrap().target.as_deref(), Some("first"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::catalog_load("connection refused").is_fatal());
        assert!(!Error::catalog("unknown column").is_fatal());
        assert!(!Error::grammar("bad identifier").is_fatal());
    }
}
