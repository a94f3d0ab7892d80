//! Разбор идентификаторов отношений и колонок
//!
//! Идентификатор отношения: `[qualifier.]name[:alias]`.
//! Идентификатор колонки: `[qualifier.]name`, где квалификатор обязан
//! существовать в пространстве отношений цели.

use crate::analyzer::RelationSpace;
use crate::common::{Error, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

lazy_static! {
    /// Зарезервированные слова, недопустимые как имена колонок
    static ref RESERVED_WORDS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        for word in [
            "true",
            "false",
            "null",
            "current_date",
            "current_time",
            "current_timestamp",
            "current_user",
            "localtime",
            "localtimestamp",
        ] {
            set.insert(word);
        }
        set
    };
}

/// Идентификатор отношения
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationIdentifier {
    /// Квалификатор (схема)
    pub qualifier: Option<String>,
    /// Имя отношения
    pub name: String,
    /// Псевдоним
    pub alias: Option<String>,
}

impl RelationIdentifier {
    /// Имя, под которым отношение регистрируется в пространстве:
    /// псевдоним, а при его отсутствии имя отношения
    pub fn space_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Полное имя для запросов каталога
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for RelationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.", qualifier)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, ":{}", alias)?;
        }
        Ok(())
    }
}

/// Идентификатор колонки
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnIdentifier {
    /// Квалификатор (псевдоним или имя отношения)
    pub qualifier: Option<String>,
    /// Имя колонки
    pub name: String,
}

impl fmt::Display for ColumnIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.", qualifier)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Проверяет, что строка является допустимым идентификатором:
/// первая буква или подчеркивание, далее словесные символы
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Является ли слово зарезервированным
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word.to_ascii_lowercase().as_str())
}

/// Разбирает идентификатор отношения `[qualifier.]name[:alias]`
pub fn parse_relation_identifier(input: &str) -> Result<RelationIdentifier> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::grammar("bad relation identifier: empty string").with_annotation(input));
    }

    // Псевдоним отделяется последним двоеточием
    let (rest, alias) = match input.rfind(':') {
        Some(pos) => (&input[..pos], Some(input[pos + 1..].to_string())),
        None => (input, None),
    };

    // Квалификатор отделяется последней точкой
    let (qualifier, name) = match rest.rfind('.') {
        Some(pos) => (Some(rest[..pos].to_string()), rest[pos + 1..].to_string()),
        None => (None, rest.to_string()),
    };

    if !is_identifier(&name) {
        return Err(
            Error::grammar(format!("bad relation identifier: invalid name '{}'", name))
                .with_annotation(input),
        );
    }
    if let Some(qualifier) = &qualifier {
        if !is_identifier(qualifier) {
            return Err(Error::grammar(format!(
                "bad relation identifier: invalid qualifier '{}'",
                qualifier
            ))
            .with_annotation(input));
        }
    }
    if let Some(alias) = &alias {
        if !is_identifier(alias) {
            return Err(Error::grammar(format!(
                "bad relation identifier: invalid alias '{}'",
                alias
            ))
            .with_annotation(input));
        }
    }

    Ok(RelationIdentifier {
        qualifier,
        name,
        alias,
    })
}

/// Разбирает идентификатор колонки `[qualifier.]name`
///
/// Присутствующий квалификатор должен быть зарегистрирован
/// в пространстве отношений цели.
pub fn parse_column_identifier(input: &str, space: &RelationSpace) -> Result<ColumnIdentifier> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::grammar("bad column identifier: empty string"));
    }

    let (qualifier, name) = match input.rfind('.') {
        Some(pos) => (Some(input[..pos].to_string()), input[pos + 1..].to_string()),
        None => (None, input.to_string()),
    };

    if !is_identifier(&name) {
        return Err(
            Error::grammar(format!("bad column identifier: invalid name '{}'", name))
                .with_annotation(input),
        );
    }
    if is_reserved_word(&name) {
        return Err(
            Error::grammar(format!("bad column identifier: reserved word '{}'", name))
                .with_annotation(input),
        );
    }
    if let Some(qualifier) = &qualifier {
        if !is_identifier(qualifier) {
            return Err(Error::grammar(format!(
                "bad column identifier: invalid qualifier '{}'",
                qualifier
            ))
            .with_annotation(input));
        }
        if !space.contains(qualifier) {
            return Err(Error::catalog(format!("unknown qualifier '{}'", qualifier))
                .with_annotation(input));
        }
    }

    Ok(ColumnIdentifier { qualifier, name })
}
