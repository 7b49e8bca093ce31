use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::shopify_schema::CanonicalRecord;

/// Ошибка обработки строки. Не прерывает выгрузку, строка исключается.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Номер строки данных (с 1, без заголовка)
    pub row: usize,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Счетчики одного запуска
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub rows_read: usize,
    pub groups_total: usize,
    /// Группы без единой валидной строки
    pub groups_dropped: usize,
    /// Строки с пустым/заглушечным SKU или ценой
    pub rows_filtered: usize,
    /// Строки, пропущенные из-за пустой первой опции
    pub rows_option_skipped: usize,
    pub rows_errored: usize,
    pub records_emitted: usize,
}

/// Результат выгрузки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub records: Vec<CanonicalRecord>,
    pub errors: Vec<ValidationError>,
    pub stats: ImportStats,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
