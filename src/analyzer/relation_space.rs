//! Пространство отношений одной цели
//!
//! Регистрирует отношения по псевдониму (или имени при отсутствии
//! псевдонима) и отклоняет дубликаты в момент объявления.

use crate::common::{Error, Result};
use crate::grammar::RelationIdentifier;
use std::collections::HashMap;

/// Реестр отношений, объявленных в одной цели
#[derive(Debug, Default)]
pub struct RelationSpace {
    entries: HashMap<String, RelationIdentifier>,
}

impl RelationSpace {
    /// Создает пустое пространство отношений
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Регистрирует отношение
    ///
    /// Ключом служит псевдоним, а при его отсутствии имя отношения.
    /// Повторное объявление ключа является структурной ошибкой
    /// независимо от порядка регистрации.
    pub fn register(&mut self, ident: &RelationIdentifier) -> Result<()> {
        let key = ident.space_key().to_string();
        if let Some(existing) = self.entries.get(&key) {
            return Err(Error::structure(format!(
                "relation alias conflict: '{}' already declared by relation '{}'",
                key, existing
            ))
            .with_relation(&ident.name));
        }
        self.entries.insert(key, ident.clone());
        Ok(())
    }

    /// Проверяет наличие ключа в пространстве
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Возвращает отношение по ключу
    pub fn get(&self, key: &str) -> Option<&RelationIdentifier> {
        self.entries.get(key)
    }

    /// Количество зарегистрированных отношений
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Пусто ли пространство
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
