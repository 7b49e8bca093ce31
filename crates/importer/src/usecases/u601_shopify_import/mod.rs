pub mod description;
pub mod executor;
pub mod export;
pub mod row_assembler;
pub mod schema_resolver;
pub mod variant_grouper;

pub use executor::ImportExecutor;

use contracts::usecases::u601_shopify_import::ValidationError;
use schema_resolver::SchemaResolutionError;
use thiserror::Error;

/// Ошибки, прерывающие выгрузку целиком
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    /// Ни одна строка не дошла до выгрузки; ошибки строк сохраняются для лога
    #[error("No valid rows to export.")]
    NoValidRows { errors: Vec<ValidationError> },
}
