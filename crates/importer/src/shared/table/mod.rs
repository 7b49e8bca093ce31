//! In-memory supplier table.
//!
//! Loaded once by the readers below and never mutated afterwards.

pub mod csv_reader;
pub mod spreadsheet_reader;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::shared::format::format_plain_number;

/// Расширения, которые умеем читать
pub const SUPPORTED_EXT: [&str; 6] = ["csv", "xls", "xlsx", "xlsm", "xlsb", "ods"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("File has no header row")]
    MissingHeader,
}

/// Ячейка исходной таблицы
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Строковое представление без лишних пробелов
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_plain_number(*n),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    /// Числовое значение ячейки, если его можно получить
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n).filter(|v| v.is_finite()),
            Cell::Text(s) => crate::shared::format::parse_number(s),
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Таблица поставщика: заголовки + строки ячеек одинаковой длины
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl SourceTable {
    /// Собирает таблицу из сырых заголовков и строк.
    ///
    /// Пустые заголовки получают имя `Unnamed: N`, повторяющиеся - суффикс `.1`, `.2`.
    /// Строки выравниваются по числу колонок, полностью пустые строки отбрасываются.
    pub fn new(raw_headers: Vec<String>, raw_rows: Vec<Vec<Cell>>) -> Self {
        let headers = normalize_headers(raw_headers);
        let width = headers.len();

        let rows = raw_rows
            .into_iter()
            .filter(|row| row.iter().any(|c| !c.is_blank()))
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn row(&self, index: usize) -> Option<SourceRow<'_>> {
        (index < self.rows.len()).then_some(SourceRow { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = SourceRow<'_>> {
        (0..self.rows.len()).map(move |index| SourceRow { table: self, index })
    }
}

/// Ссылка на строку таблицы
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'t> {
    table: &'t SourceTable,
    index: usize,
}

impl<'t> SourceRow<'t> {
    /// Индекс строки данных (с 0)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Номер строки для сообщений об ошибках (с 1)
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Ячейка по точному имени заголовка
    pub fn get(&self, header: &str) -> Option<&'t Cell> {
        let table = self.table;
        table
            .column_index(header)
            .map(|col| table.rows[self.index].get(col).unwrap_or(&EMPTY_CELL))
    }

    /// Текст ячейки, пустая строка если колонки нет
    pub fn text(&self, header: &str) -> String {
        self.get(header).map(Cell::as_text).unwrap_or_default()
    }

    /// Пары (заголовок, ячейка) в порядке колонок
    pub fn cells(&self) -> impl Iterator<Item = (&'t str, &'t Cell)> {
        let table = self.table;
        table
            .headers
            .iter()
            .map(String::as_str)
            .zip(table.rows[self.index].iter())
    }
}

fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim().trim_start_matches('\u{FEFF}').to_string();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            trimmed
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.push(name);
    }
    seen
}

/// Читает таблицу, выбирая формат по расширению
pub fn read_table(path: &Path) -> Result<SourceTable, TableError> {
    let ext = extension_of(path);
    let table = match ext.as_str() {
        "csv" => csv_reader::read_csv(path)?,
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => spreadsheet_reader::read_spreadsheet(path)?,
        _ => return Err(TableError::UnsupportedFormat(path.display().to_string())),
    };

    tracing::info!(
        "Loaded {}: {} rows, {} columns",
        path.display(),
        table.len(),
        table.headers().len()
    );
    Ok(table)
}

/// Файлы поддерживаемых форматов в каталоге (без временных `~$` файлов Excel)
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>, TableError> {
    let entries = std::fs::read_dir(dir).map_err(|source| TableError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            !name.starts_with("~$") && SUPPORTED_EXT.contains(&extension_of(path).as_str())
        })
        .collect();
    files.sort();
    Ok(files)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_headers_deduplicated_and_named() {
        let table = SourceTable::new(
            vec!["Model".into(), " ".into(), "Model".into(), "Model".into()],
            vec![],
        );
        assert_eq!(
            table.headers(),
            &["Model", "Unnamed: 1", "Model.1", "Model.2"]
        );
    }

    #[test]
    fn test_blank_rows_dropped_and_short_rows_padded() {
        let table = SourceTable::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![text("1")],
                vec![Cell::Empty, text("  ")],
                vec![text("2"), text("3")],
            ],
        );
        assert_eq!(table.len(), 2);
        let first = table.row(0).unwrap();
        assert_eq!(first.text("A"), "1");
        assert_eq!(first.get("B"), Some(&Cell::Empty));
        assert_eq!(first.get("C"), None);
        assert_eq!(table.row(1).unwrap().number(), 2);
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::Number(12.0).as_text(), "12");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
        assert_eq!(text(" 1,250.00 ").as_number(), Some(1250.0));
        assert_eq!(text("abc").as_number(), None);
        assert!(text("   ").is_blank());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_table(Path::new("supplier.pdf")).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_discover_input_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.csv", "~$a.xlsx", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let files = discover_input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.xlsx"]);
    }
}
