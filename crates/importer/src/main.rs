pub mod args;
pub mod shared;
pub mod system;
pub mod usecases;

use anyhow::Context;
use clap::Parser;
use contracts::enums::OutputMode;
use std::path::PathBuf;

use args::Cli;
use shared::format::group_thousands;
use shared::table::{discover_input_files, read_table};
use usecases::u601_shopify_import::{export, ImportError, ImportExecutor};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    system::tracing::initialize()?;

    let mut config = shared::config::load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    let mode = OutputMode::from(cli.mode);

    let input = match &cli.input {
        Some(path) => path.clone(),
        None => pick_input_file()?,
    };
    tracing::info!(
        "Input: {} | mode: {} | {}",
        input.display(),
        mode.display_name(),
        if config.digital { "digital products" } else { "physical products" }
    );

    let table = read_table(&input).with_context(|| format!("Cannot load {}", input.display()))?;

    let executor = ImportExecutor::new(config);
    let report = match executor.run(&table) {
        Ok(report) => report,
        Err(ImportError::NoValidRows { errors }) => {
            for error in &errors {
                tracing::warn!("{}", error);
            }
            anyhow::bail!("No valid rows to export.");
        }
        Err(e) => return Err(e.into()),
    };

    let files = export::export_report(&report, mode, &cli.output_dir, chrono::Local::now())?;

    println!("Export complete: {}", files.records.display());
    println!(
        "  {} rows written, {} rows filtered, {} skipped for options",
        group_thousands(&report.stats.records_emitted.to_string(), ','),
        report.stats.rows_filtered,
        report.stats.rows_option_skipped
    );
    if let Some(log) = &files.error_log {
        println!("  {} rows with errors, see {}", report.errors.len(), log.display());
    }
    Ok(())
}

/// The single supported file in the current directory
fn pick_input_file() -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let mut files = discover_input_files(&cwd)?;
    match files.len() {
        0 => anyhow::bail!("No CSV/Excel files found in {}", cwd.display()),
        1 => Ok(files.remove(0)),
        _ => {
            let names: Vec<String> = files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            anyhow::bail!(
                "Several input files found, choose one with --input: {}",
                names.join(", ")
            )
        }
    }
}
