//! Разбор списков идентификаторов
//!
//! Список разделяется запятыми; одиночная звездочка означает "все колонки".

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Список колонок из аннотации
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierList {
    /// Все колонки (`*`)
    All,
    /// Явно перечисленные имена
    Names(Vec<String>),
}

impl IdentifierList {
    /// Является ли список пустым
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All => false,
            Self::Names(names) => names.is_empty(),
        }
    }
}

/// Разбирает список идентификаторов, разделенных запятыми
///
/// Одиночная `*` означает "все". Пустой список, когда он обязателен,
/// является ошибкой "missing column list".
pub fn parse_identifier_list(input: &str) -> Result<IdentifierList> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::grammar("missing column list"));
    }
    if input == "*" {
        return Ok(IdentifierList::All);
    }

    let mut names = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(
                Error::grammar("missing column list: empty list item").with_annotation(input)
            );
        }
        names.push(part.to_string());
    }

    Ok(IdentifierList::Names(names))
}
