use std::collections::HashSet;

use super::row_assembler::{RowAssembler, VariantInput};
use super::schema_resolver::{resolve_columns, AliasTable};
use super::variant_grouper::{sanitize_handle, RowValidity, VariantGrouper, VariantOptions};
use super::ImportError;
use crate::shared::format::group_thousands;
use crate::shared::table::SourceTable;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u601_shopify_import::{
    ImportConfig, ImportReport, ImportStats, ShopifyImport, ValidationError,
};

/// Выше этого числа строк выгрузка все равно выполняется, но с предупреждением
pub const LARGE_INPUT_ROWS: usize = 1500;

/// Executor для UseCase выгрузки в Shopify
pub struct ImportExecutor {
    config: ImportConfig,
}

impl ImportExecutor {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Один проход по таблице: сопоставление колонок, группировка, сборка записей.
    ///
    /// Ошибки строк копятся в отчете; фатальны только несопоставленные
    /// обязательные колонки и пустой результат.
    pub fn run(&self, table: &SourceTable) -> Result<ImportReport, ImportError> {
        let config = &self.config;
        let started_at = chrono::Utc::now();
        tracing::info!(
            "{}: processing {} rows, {} columns",
            ShopifyImport::full_name(),
            group_thousands(&table.len().to_string(), ','),
            table.headers().len()
        );
        if table.len() > LARGE_INPUT_ROWS {
            tracing::warn!(
                "Input has {} rows (more than {}), Shopify imports of this size may be slow",
                table.len(),
                LARGE_INPUT_ROWS
            );
        }

        let aliases = AliasTable::with_overrides(&config.column_aliases);
        let columns = resolve_columns(table.headers(), &aliases, &config.required_columns)?;
        for (field, header) in columns.iter() {
            tracing::info!("  {} <- '{}'", field.name(), header);
        }

        let grouper = VariantGrouper::new(table, &columns, &config.variant_option_fields);
        let assembler = RowAssembler::new(config, table, &columns);

        let (groups, mut errors) = grouper.group(table);
        let mut stats = ImportStats {
            rows_read: table.len(),
            groups_total: groups.len(),
            ..ImportStats::default()
        };
        let mut records = Vec::new();
        let mut used_handles: HashSet<String> = HashSet::new();

        for group in &groups {
            let handle = sanitize_handle(&group.model);
            // хэндл занимает только группа, выгрузившая хотя бы одну запись
            let duplicate = used_handles.contains(&handle);
            let mut has_primary = false;

            for row in &group.rows {
                let list_price = match grouper.validate(row) {
                    RowValidity::Valid { list_price } => list_price,
                    RowValidity::Filtered => {
                        stats.rows_filtered += 1;
                        continue;
                    }
                    RowValidity::Invalid(message) => {
                        errors.push(ValidationError::new(row.number(), message));
                        continue;
                    }
                };

                if duplicate {
                    errors.push(ValidationError::new(
                        row.number(),
                        format!("Duplicate handle detected: {}", handle),
                    ));
                    continue;
                }

                let is_primary = !has_primary;
                has_primary = true;

                let options = grouper.options(row);
                if options == VariantOptions::Skip {
                    tracing::warn!(
                        "Row {}: first variant option is blank while a later one is set, row skipped",
                        row.number()
                    );
                    stats.rows_option_skipped += 1;
                    continue;
                }

                let input = VariantInput {
                    row: *row,
                    handle: &handle,
                    model: &group.model,
                    list_price,
                    is_primary,
                    options: &options,
                };
                match assembler.assemble(&grouper, input) {
                    Ok(record) => {
                        if !used_handles.contains(&handle) {
                            used_handles.insert(handle.clone());
                        }
                        records.push(record);
                    }
                    Err(e) => errors.push(ValidationError::new(row.number(), e.to_string())),
                }
            }

            if !has_primary && !duplicate {
                stats.groups_dropped += 1;
                tracing::debug!("Group '{}' has no valid rows, dropped", group.model);
            }
        }

        errors.sort_by_key(|e| e.row);
        stats.rows_errored = errors.len();
        stats.records_emitted = records.len();

        if records.is_empty() {
            tracing::error!("No valid rows to export ({} errors)", errors.len());
            return Err(ImportError::NoValidRows { errors });
        }

        tracing::info!(
            "Done: {} records from {} groups, {} filtered, {} option-skipped, {} errors",
            stats.records_emitted,
            stats.groups_total,
            stats.rows_filtered,
            stats.rows_option_skipped,
            stats.rows_errored
        );

        Ok(ImportReport {
            records,
            errors,
            stats,
            started_at,
            completed_at: chrono::Utc::now(),
        })
    }
}
