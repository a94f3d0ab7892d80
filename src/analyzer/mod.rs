//! Структурный анализатор для sqlplan
//!
//! Этот модуль превращает дескриптор цели в сырое промежуточное
//! представление: находит поле отношения, разворачивает поля записи,
//! строит условия, соединения и директивы. Семантическая сверка
//! с каталогом выполняется отдельным валидатором.

pub mod join_builder;
pub mod relation_space;
pub mod relation_type;
pub mod structural;
pub mod type_cache;
pub mod where_builder;

#[cfg(test)]
pub mod tests;

// Переэкспортируем основные типы
pub use relation_space::RelationSpace;
pub use structural::StructuralAnalyzer;
pub use type_cache::RelationTypeCache;

use crate::common::{AnalyzerConfig, Error, Result};
use crate::descriptor::{QueryKind, TargetDescriptor};
use crate::ir::QueryIr;
use std::sync::Arc;

/// Контекст одного прогона анализа
///
/// Явное значение, протягиваемое через все проверки: из него читается
/// контекст отношения и цели при построении ошибок вместо обращения
/// к разделяемому состоянию анализатора.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Имя анализируемой цели
    pub target: String,
    /// Вид запроса
    pub kind: QueryKind,
    /// Отношение в текущей области видимости
    pub relation: Option<String>,
}

impl AnalysisContext {
    /// Создает контекст для цели
    pub fn new(target: &str, kind: QueryKind) -> Self {
        Self {
            target: target.to_string(),
            kind,
            relation: None,
        }
    }

    /// Устанавливает отношение текущей области видимости
    pub fn set_relation(&mut self, name: &str) {
        self.relation = Some(name.to_string());
    }

    /// Дополняет ошибку контекстом прогона
    pub fn enrich(&self, err: Error) -> Error {
        let err = err.with_target(&self.target);
        match &self.relation {
            Some(relation) => err.with_relation(relation),
            None => err,
        }
    }
}

/// Фасад анализа: настройки и разделяемый кэш типов
pub struct Analyzer {
    config: AnalyzerConfig,
    type_cache: Arc<RelationTypeCache>,
}

impl Analyzer {
    /// Создает анализатор с настройками по умолчанию
    pub fn new(config: AnalyzerConfig) -> Self {
        let type_cache = Arc::new(RelationTypeCache::new(config.enable_type_cache));
        Self { config, type_cache }
    }

    /// Создает анализатор с внешним кэшем типов
    ///
    /// Параллельные анализы разных целей разделяют один кэш;
    /// тесты строят изолированные экземпляры.
    pub fn with_cache(config: AnalyzerConfig, type_cache: Arc<RelationTypeCache>) -> Self {
        Self { config, type_cache }
    }

    /// Анализирует одну цель
    pub fn analyze(&self, target: &TargetDescriptor) -> Result<QueryIr> {
        StructuralAnalyzer::new(&self.config, &self.type_cache).analyze(target)
    }

    /// Разделяемый кэш типов
    pub fn type_cache(&self) -> &Arc<RelationTypeCache> {
        &self.type_cache
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
