use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use super::{Cell, SourceTable, TableError};

/// Читает первый лист книги Excel/ODS
pub fn read_spreadsheet(path: &Path) -> Result<SourceTable, TableError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        TableError::Spreadsheet(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::Spreadsheet("No worksheet found".to_string()))?
        .map_err(|e| TableError::Spreadsheet(format!("Failed to read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| convert_cell(c).as_text()).collect(),
        None => return Err(TableError::MissingHeader),
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Err(TableError::MissingHeader);
    }

    let data: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(SourceTable::new(headers, data))
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::Empty), Cell::Empty);
        assert_eq!(convert_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(convert_cell(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(
            convert_cell(&Data::String("230V".to_string())),
            Cell::Text("230V".to_string())
        );
        assert_eq!(convert_cell(&Data::String("  ".to_string())), Cell::Empty);
        assert_eq!(convert_cell(&Data::Bool(true)), Cell::Text("TRUE".to_string()));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = read_spreadsheet(Path::new("/nonexistent/supplier.xlsx")).unwrap_err();
        assert!(matches!(err, TableError::Spreadsheet(_)));
    }
}
