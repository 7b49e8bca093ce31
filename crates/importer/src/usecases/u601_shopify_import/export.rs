use anyhow::Context;
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::enums::OutputMode;
use contracts::shared::shopify_schema::{headers_for, CanonicalRecord};
use contracts::usecases::u601_shopify_import::{ImportReport, ValidationError};

/// Файлы, записанные по итогам выгрузки
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub records: PathBuf,
    pub error_log: Option<PathBuf>,
}

pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M").to_string()
}

/// Записывает CSV для Shopify и, если были ошибки строк, лог ошибок
pub fn export_report(
    report: &ImportReport,
    mode: OutputMode,
    output_dir: &Path,
    now: DateTime<Local>,
) -> anyhow::Result<ExportedFiles> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create output directory {}", output_dir.display()))?;

    let ts = timestamp(now);
    let records_path = output_dir.join(format!("{}_{}.csv", mode.file_prefix(), ts));
    write_records(&records_path, &report.records, mode)?;
    tracing::info!(
        "Exported {} rows to {}",
        report.records.len(),
        records_path.display()
    );

    let error_log = if report.errors.is_empty() {
        None
    } else {
        let path = output_dir.join(format!("errors_{}.log", ts));
        write_error_log(&path, &report.errors)?;
        tracing::warn!("{} row errors written to {}", report.errors.len(), path.display());
        Some(path)
    };

    Ok(ExportedFiles {
        records: records_path,
        error_log,
    })
}

pub fn write_records(path: &Path, records: &[CanonicalRecord], mode: OutputMode) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    writer.write_record(headers_for(mode))?;
    for record in records {
        writer.write_record(record.project(mode))?;
    }
    writer.flush()?;
    Ok(())
}

/// Одна строка на ошибку: "Row N: сообщение"
pub fn write_error_log(path: &Path, errors: &[ValidationError]) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    for error in errors {
        writeln!(file, "{}", error)?;
    }
    Ok(())
}
