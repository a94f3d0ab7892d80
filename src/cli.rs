//! CLI интерфейс для sqlplan
//!
//! Предоставляет командную строку для проверки дескрипторов целей
//! против снимка каталога без живого соединения.

use crate::analyzer::Analyzer;
use crate::catalog::CatalogSnapshot;
use crate::common::{Config, Error, Result};
use crate::descriptor::TargetDescriptor;
use clap::{Parser, Subcommand};
use log::info;
use rayon::prelude::*;
use std::path::PathBuf;

/// sqlplan - анализатор аннотированных описаний SQL запросов
#[derive(Parser)]
#[command(name = "sqlplan")]
#[command(about = "sqlplan - annotation-driven SQL statement analyzer")]
#[command(version)]
pub struct Cli {
    /// Конфигурационный файл
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Уровень детализации логирования
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Проверить дескрипторы целей против снимка каталога
    Check {
        /// JSON файл со снимком каталога
        #[arg(short, long, value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// JSON файл с дескрипторами целей
        #[arg(short, long, value_name = "TARGETS")]
        targets: PathBuf,

        /// Печатать собранные планы в JSON
        #[arg(long)]
        emit_plans: bool,
    },

    /// Показать информацию о системе
    Info,
}

/// Итог проверки одного файла дескрипторов
pub struct CheckOutcome {
    /// Количество успешно проверенных целей
    pub passed: usize,
    /// Ошибки с именами целей
    pub failures: Vec<(String, Error)>,
}

/// Выполняет подкоманду `check`
pub fn run_check(
    snapshot_path: &PathBuf,
    targets_path: &PathBuf,
    emit_plans: bool,
    config: &Config,
) -> Result<CheckOutcome> {
    let snapshot_text = std::fs::read_to_string(snapshot_path)?;
    let snapshot = CatalogSnapshot::from_json(&snapshot_text)?;
    let catalog = snapshot.into_catalog(&config.connection.cache_key())?;

    let targets_text = std::fs::read_to_string(targets_path)?;
    let targets: Vec<TargetDescriptor> = serde_json::from_str(&targets_text)?;
    info!("checking {} targets", targets.len());

    let analyzer = Analyzer::new(config.analyzer.clone());

    // Цели независимы; анализы разделяют кэш типов и модель каталога
    let results: Vec<(String, Result<String>)> = targets
        .par_iter()
        .map(|target| {
            let outcome = crate::analyze_target(&analyzer, &catalog, target).and_then(|plan| {
                if emit_plans {
                    serde_json::to_string_pretty(&plan).map_err(Error::from)
                } else {
                    Ok(String::new())
                }
            });
            (target.name.clone(), outcome)
        })
        .collect();

    let mut outcome = CheckOutcome {
        passed: 0,
        failures: Vec::new(),
    };
    for (name, result) in results {
        match result {
            Ok(plan_json) => {
                outcome.passed += 1;
                if emit_plans {
                    println!("{}", plan_json);
                }
            }
            Err(err) => outcome.failures.push((name, err)),
        }
    }
    Ok(outcome)
}

/// Печатает информацию о системе
pub fn run_info() {
    println!("sqlplan {}", crate::VERSION);
    println!("annotation-driven SQL statement analyzer and plan validator");
}
