use std::path::Path;

use super::{Cell, SourceTable, TableError};

/// Читает CSV файл поставщика
pub fn read_csv(path: &Path) -> Result<SourceTable, TableError> {
    let bytes = std::fs::read(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    // Excel часто сохраняет CSV не в UTF-8
    let text = String::from_utf8_lossy(&bytes);
    parse_csv(&text)
}

/// Разбирает CSV текст. Все непустые ячейки остаются текстом,
/// числа распознаются позже по месту использования.
pub fn parse_csv(csv_text: &str) -> Result<SourceTable, TableError> {
    // Strip UTF-8 BOM if present
    let text = csv_text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(TableError::MissingHeader);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping malformed CSV record: {}", e);
                continue;
            }
        };

        let cells = record
            .iter()
            .map(|value| {
                if value.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(value.to_string())
                }
            })
            .collect();
        rows.push(cells);
    }

    Ok(SourceTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_with_bom() {
        let table = parse_csv("\u{FEFF}Model,List Price\nX1,100\n,\nX2,\n").unwrap();
        assert_eq!(table.headers(), &["Model", "List Price"]);
        assert_eq!(table.len(), 2);
        let second = table.row(1).unwrap();
        assert_eq!(second.text("Model"), "X2");
        assert_eq!(second.get("List Price"), Some(&Cell::Empty));
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let table = parse_csv("A,B,C\n1,2\n3,4,5,6\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).unwrap().get("C"), Some(&Cell::Empty));
        assert_eq!(table.row(1).unwrap().text("C"), "5");
    }

    #[test]
    fn test_read_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supplier.csv");
        std::fs::write(&path, "Model,Voltage\n\"Pump, big\",230V\n").unwrap();

        let table = read_csv(&path).unwrap();
        assert_eq!(table.row(0).unwrap().text("Model"), "Pump, big");
    }
}
