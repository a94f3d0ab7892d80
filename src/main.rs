//! Точка входа sqlplan

use anyhow::Context;
use clap::Parser;
use sqlplan::cli::{run_check, run_info, Cli, Commands};
use sqlplan::common::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Приоритет уровня логирования: флаг CLI, затем конфигурация
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::new()
        .parse_filters(&log_level)
        .init();

    match &cli.command {
        Some(Commands::Check {
            snapshot,
            targets,
            emit_plans,
        }) => {
            let outcome = run_check(snapshot, targets, *emit_plans, &config)?;
            println!("passed: {}", outcome.passed);
            if !outcome.failures.is_empty() {
                for (target, err) in &outcome.failures {
                    eprintln!("{}: {}", target, err);
                }
                anyhow::bail!("{} targets failed validation", outcome.failures.len());
            }
        }
        Some(Commands::Info) | None => run_info(),
    }

    Ok(())
}
