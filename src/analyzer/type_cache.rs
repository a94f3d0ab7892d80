//! Кэш разобранных типов отношений
//!
//! Один и тот же составной тип записи может использоваться многими
//! целями, поэтому результат развертки списка полей мемоизируется по
//! структурному ключу типа. Кэш разделяется параллельными анализами:
//! читатели идут по разделяемой блокировке, заполнение берет
//! эксклюзивную.

use crate::ir::IrField;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Разделяемый кэш развернутых списков полей
pub struct RelationTypeCache {
    entries: RwLock<HashMap<String, Arc<Vec<IrField>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    enabled: bool,
}

impl RelationTypeCache {
    /// Создает новый кэш
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            enabled,
        }
    }

    /// Возвращает закэшированный список полей по структурному ключу
    pub fn get(&self, key: &str) -> Option<Arc<Vec<IrField>>> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.read().expect("type cache lock poisoned");
        match entries.get(key) {
            Some(fields) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(fields))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Сохраняет список полей под структурным ключом
    pub fn insert(&self, key: String, fields: Arc<Vec<IrField>>) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write().expect("type cache lock poisoned");
        entries.entry(key).or_insert(fields);
    }

    /// Статистика попаданий и промахов
    pub fn statistics(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Количество записей в кэше
    pub fn len(&self) -> usize {
        self.entries.read().expect("type cache lock poisoned").len()
    }

    /// Пуст ли кэш
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Очищает кэш
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("type cache lock poisoned")
            .clear();
    }

    /// Включен ли кэш
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for RelationTypeCache {
    fn default() -> Self {
        Self::new(true)
    }
}
