//! sqlplan - анализатор аннотированных описаний SQL запросов
//!
//! Этот модуль предоставляет конвейер семантического анализа:
//! разбор встроенных мини-языков аннотаций, структурный анализ
//! дескрипторов целей, модель системного каталога и семантическую
//! проверку с выбором процедур преобразования типов. Результатом
//! является проверенный план запроса для генератора кода.

pub mod analyzer;
pub mod catalog;
pub mod cli;
pub mod common;
pub mod descriptor;
pub mod grammar;
pub mod ir;
pub mod typecheck;
pub mod validator;

pub use common::error::{Error, Result};

/// Версия библиотеки
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::analyzer::Analyzer;
use crate::catalog::CatalogAccess;
use crate::descriptor::TargetDescriptor;
use crate::validator::{QueryPlan, SemanticValidator};

/// Выполняет полный конвейер анализа одной цели
///
/// Структурный анализ строит промежуточное представление, валидатор
/// сверяет его с каталогом и собирает план. Цель либо проходит
/// проверку целиком, либо не дает плана вовсе.
pub fn analyze_target(
    analyzer: &Analyzer,
    catalog: &dyn CatalogAccess,
    target: &TargetDescriptor,
) -> Result<QueryPlan> {
    let ir = analyzer.analyze(target)?;
    SemanticValidator::new(catalog).validate(&ir)
}
