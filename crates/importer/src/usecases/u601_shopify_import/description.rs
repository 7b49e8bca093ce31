use std::collections::HashSet;

use super::schema_resolver::{CanonicalField, ColumnMap};
use crate::shared::format::format_plain_number;
use crate::shared::table::{SourceRow, SourceTable};
use contracts::shared::shopify_schema::is_shopify_header;
use contracts::usecases::u601_shopify_import::ImportConfig;

/// Очистка HTML описания: только теги разметки описания и ссылки.
///
/// Ячейки поставщика попадают в описание как есть, поэтому любые другие
/// теги, атрибуты `on*` и `javascript:` ссылки удаляются.
pub fn sanitize_description(html: &str) -> String {
    ammonia::Builder::new()
        .tags(maplit::hashset!["p", "strong", "em", "br", "a"])
        .tag_attributes(maplit::hashmap![
            "a" => maplit::hashset!["href", "target"],
        ])
        .clean(html)
        .to_string()
}

#[derive(Debug, Clone)]
struct LeadField {
    label: String,
    header: Option<String>,
}

/// Строит HTML описание варианта из колонок строки поставщика
#[derive(Debug, Clone)]
pub struct DescriptionSynthesizer {
    lead_fields: Vec<LeadField>,
    skipped_headers: HashSet<String>,
    weight_threshold: f64,
    digital: bool,
    manufacturer_url: String,
}

impl DescriptionSynthesizer {
    pub fn new(config: &ImportConfig, table: &SourceTable, columns: &ColumnMap) -> Self {
        let lead_fields: Vec<LeadField> = config
            .description_include_columns
            .iter()
            .map(|name| {
                let header = table
                    .headers()
                    .iter()
                    .find(|h| h.as_str() == name)
                    .cloned()
                    .or_else(|| {
                        CanonicalField::parse(name)
                            .and_then(|f| columns.get(f))
                            .map(str::to_string)
                    });
                LeadField {
                    label: name.replace('_', " "),
                    header,
                }
            })
            .collect();

        let skipped_headers = lead_fields
            .iter()
            .filter_map(|f| f.header.clone())
            .chain(config.description_exclude_columns.iter().cloned())
            .collect();

        Self {
            lead_fields,
            skipped_headers,
            weight_threshold: config.weight_threshold,
            digital: config.digital,
            manufacturer_url: config.manufacturer_url.trim().to_string(),
        }
    }

    pub fn build(&self, row: &SourceRow<'_>, weight: Option<f64>) -> String {
        let mut html = String::from("<p>");
        for field in &self.lead_fields {
            let value = field.header.as_deref().map(|h| row.text(h)).unwrap_or_default();
            if !value.is_empty() {
                html.push_str(&format!("<strong>{}: </strong> {}<br>", field.label, value));
            }
        }
        html.push_str("</p>");

        for (header, cell) in row.cells() {
            if cell.is_blank() || self.skipped_headers.contains(header) || is_shopify_header(header) {
                continue;
            }
            html.push_str(&format!("<p><strong>{}: </strong> {}</p>", header, cell.as_text()));
        }

        if !self.digital && weight.is_some_and(|w| w > self.weight_threshold) {
            html.push_str(&format!(
                "<p><em>NOTE: We will contact you during order fulfilment to discuss shipping and \
                 handling costs for products weighing more than {} pounds. These costs will be \
                 billed separately.</em></p>",
                format_plain_number(self.weight_threshold)
            ));
        }

        if !self.manufacturer_url.is_empty() {
            html.push_str(&format!(
                "<p><a href=\"{}\" target=\"_blank\">View Manufacturer Website</a></p>",
                self.manufacturer_url
            ));
        }

        sanitize_description(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::table::csv_reader::parse_csv;

    fn setup(csv: &str) -> (SourceTable, ColumnMap) {
        let table = parse_csv(csv).unwrap();
        let mut columns = ColumnMap::default();
        columns.insert(CanonicalField::Model, "Model");
        columns.insert(CanonicalField::Voltage, "Voltage");
        columns.insert(CanonicalField::Power, "Power HP");
        (table, columns)
    }

    #[test]
    fn test_lead_fields_then_other_columns() {
        let config = ImportConfig::default();
        let (table, columns) = setup("Model,Voltage,Power HP,Flow Rate,Status,Notes\nTOP-S,230,0.5,40 GPM,active,\n");
        let synth = DescriptionSynthesizer::new(&config, &table, &columns);
        let html = synth.build(&table.row(0).unwrap(), Some(10.0));

        assert!(html.starts_with(
            "<p><strong>Model: </strong> TOP-S<br><strong>Voltage: </strong> 230<br>\
             <strong>Power: </strong> 0.5<br></p>"
        ));
        assert!(html.contains("<p><strong>Flow Rate: </strong> 40 GPM</p>"));
        // destination headers and blanks are not repeated
        assert!(!html.contains("Status"));
        assert!(!html.contains("Notes"));
        assert!(!html.contains("<strong>Power HP"));
        assert!(!html.contains("NOTE:"));
        assert!(html.contains("href=\"https://wilo.com/en/overview.html\""));
        assert!(html.contains("target=\"_blank\""));
    }

    #[test]
    fn test_heavy_item_notice() {
        let config = ImportConfig::default();
        let (table, columns) = setup("Model,Voltage,Power HP\nA,230,1\n");
        let synth = DescriptionSynthesizer::new(&config, &table, &columns);
        let row = table.row(0).unwrap();

        let html = synth.build(&row, Some(151.0));
        assert!(html.contains(
            "<p><em>NOTE: We will contact you during order fulfilment to discuss shipping and \
             handling costs for products weighing more than 150 pounds. These costs will be \
             billed separately.</em></p>"
        ));
        assert!(!synth.build(&row, Some(150.0)).contains("NOTE:"));

        let digital = ImportConfig {
            digital: true,
            ..ImportConfig::default()
        };
        let synth = DescriptionSynthesizer::new(&digital, &table, &columns);
        assert!(!synth.build(&row, Some(500.0)).contains("NOTE:"));
    }

    #[test]
    fn test_excluded_columns_and_no_link() {
        let config = ImportConfig {
            description_include_columns: vec!["Model".to_string(), "Flow_Rate".to_string()],
            description_exclude_columns: vec!["Internal Code".to_string()],
            manufacturer_url: String::new(),
            ..ImportConfig::default()
        };
        let (table, columns) = setup("Model,Flow_Rate,Internal Code,Voltage\nA,40,X-1,230\n");
        let synth = DescriptionSynthesizer::new(&config, &table, &columns);
        let html = synth.build(&table.row(0).unwrap(), None);

        assert!(html.starts_with("<p><strong>Model: </strong> A<br><strong>Flow Rate: </strong> 40<br></p>"));
        assert!(html.contains("<p><strong>Voltage: </strong> 230</p>"));
        assert!(!html.contains("X-1"));
        assert!(!html.contains("<a"));
    }

    #[test]
    fn test_supplier_markup_is_sanitized() {
        let config = ImportConfig::default();
        let (table, columns) = setup("Model,Voltage,Power HP,Remark\nA,230,1,<script>alert(1)</script><b onclick='x()'>bold</b>\n");
        let synth = DescriptionSynthesizer::new(&config, &table, &columns);
        let html = synth.build(&table.row(0).unwrap(), None);

        assert!(!html.contains("<script"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("bold"));
    }
}
