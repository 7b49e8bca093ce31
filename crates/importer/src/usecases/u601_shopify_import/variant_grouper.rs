//! Splits supplier rows into per-model variant groups and decides, row by
//! row, whether a variant is emitted, silently filtered or reported.

use std::collections::HashMap;

use super::schema_resolver::{CanonicalField, ColumnMap};
use crate::shared::table::{SourceRow, SourceTable};
use contracts::usecases::u601_shopify_import::ValidationError;

/// Значения-заглушки поставщика: пустые, прочерки, N/A, CF
const PLACEHOLDERS: [&str; 7] = ["", "-", "\u{2014}", "N/A", "CF", "\u{e2}\u{20ac}\u{201d}", "NAN"];

pub const MAX_OPTIONS: usize = 3;

/// Значение отсутствует или является заглушкой
pub fn is_placeholder(value: &str) -> bool {
    let upper = value.trim().to_uppercase();
    PLACEHOLDERS.iter().any(|p| p.to_uppercase() == upper)
}

/// Handle товара из модели: "Model ABC (2HP)" -> "model-abc-2hp"
pub fn sanitize_handle(model: &str) -> String {
    model
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| if c == ' ' || c == '/' { '-' } else { c })
        .collect()
}

/// Uppercase alphanumerics only, for synthesized SKUs
fn normalize_sku_part(part: &str) -> String {
    part.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// SKU из типа товара, модели и непустых значений опций
pub fn synthesize_sku<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let sku = parts
        .into_iter()
        .map(normalize_sku_part)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if sku.is_empty() {
        "AUTO-SKU".to_string()
    } else {
        sku
    }
}

/// Группа вариантов одной модели
#[derive(Debug, Clone)]
pub struct ModelGroup<'t> {
    pub model: String,
    pub rows: Vec<SourceRow<'t>>,
}

/// Решение по строке перед сборкой записи
#[derive(Debug, Clone, PartialEq)]
pub enum RowValidity {
    Valid { list_price: f64 },
    /// Заглушка в SKU или цене, либо нулевая цена
    Filtered,
    Invalid(String),
}

/// Опции варианта
#[derive(Debug, Clone, PartialEq)]
pub enum VariantOptions {
    None,
    /// (имя, значение) по слотам; пустой слот - ("", "")
    Slots(Vec<(String, String)>),
    /// Первая опция пуста при непустой последующей
    Skip,
}

impl VariantOptions {
    /// Non-blank option values in slot order
    pub fn values(&self) -> Vec<&str> {
        match self {
            VariantOptions::Slots(slots) => slots
                .iter()
                .map(|(_, v)| v.as_str())
                .filter(|v| !v.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn slot(&self, index: usize) -> (&str, &str) {
        match self {
            VariantOptions::Slots(slots) => slots
                .get(index)
                .map(|(n, v)| (n.as_str(), v.as_str()))
                .unwrap_or(("", "")),
            _ => ("", ""),
        }
    }
}

#[derive(Debug, Clone)]
struct OptionSlot {
    name: String,
    header: Option<String>,
}

pub struct VariantGrouper<'m> {
    columns: &'m ColumnMap,
    option_slots: Vec<OptionSlot>,
}

impl<'m> VariantGrouper<'m> {
    /// Слоты опций: сначала заголовок таблицы, затем каноническое поле
    pub fn new(table: &SourceTable, columns: &'m ColumnMap, option_fields: &[String]) -> Self {
        let option_slots = option_fields
            .iter()
            .take(MAX_OPTIONS)
            .map(|name| {
                let header = table
                    .headers()
                    .iter()
                    .find(|h| h.trim().eq_ignore_ascii_case(name.trim()))
                    .cloned()
                    .or_else(|| {
                        CanonicalField::parse(name)
                            .and_then(|f| columns.get(f))
                            .map(str::to_string)
                    });
                if header.is_none() {
                    tracing::warn!("Option field '{}' not found in the table", name);
                }
                OptionSlot {
                    name: name.clone(),
                    header,
                }
            })
            .collect();

        Self {
            columns,
            option_slots,
        }
    }

    pub fn columns(&self) -> &'m ColumnMap {
        self.columns
    }

    /// Текст канонического поля строки, пустая строка если поле не сопоставлено
    pub fn field_text(&self, row: &SourceRow<'_>, field: CanonicalField) -> String {
        self.columns.get(field).map(|h| row.text(h)).unwrap_or_default()
    }

    /// Rows grouped by trimmed model, in first-appearance order.
    /// Rows without a model come back as errors.
    pub fn group<'t>(&self, table: &'t SourceTable) -> (Vec<ModelGroup<'t>>, Vec<ValidationError>) {
        let mut groups: Vec<ModelGroup<'t>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut errors = Vec::new();

        for row in table.rows() {
            let model = self.field_text(&row, CanonicalField::Model);
            if is_placeholder(&model) {
                errors.push(ValidationError::new(row.number(), "Missing model"));
                continue;
            }
            match positions.get(&model) {
                Some(&pos) => groups[pos].rows.push(row),
                None => {
                    positions.insert(model.clone(), groups.len());
                    groups.push(ModelGroup {
                        model,
                        rows: vec![row],
                    });
                }
            }
        }

        (groups, errors)
    }

    pub fn validate(&self, row: &SourceRow<'_>) -> RowValidity {
        if self.columns.contains(CanonicalField::ArticleNumber)
            && is_placeholder(&self.field_text(row, CanonicalField::ArticleNumber))
        {
            return RowValidity::Filtered;
        }

        let price_cell = self
            .columns
            .get(CanonicalField::ListPrice)
            .and_then(|h| row.get(h));
        let price_text = price_cell.map(|c| c.as_text()).unwrap_or_default();
        if is_placeholder(&price_text) {
            return RowValidity::Filtered;
        }

        match price_cell.and_then(|c| c.as_number()) {
            Some(p) if p == 0.0 => RowValidity::Filtered,
            Some(list_price) => RowValidity::Valid { list_price },
            None => RowValidity::Invalid(format!("Invalid list price: {}", price_text)),
        }
    }

    pub fn options(&self, row: &SourceRow<'_>) -> VariantOptions {
        if self.option_slots.is_empty() {
            return VariantOptions::None;
        }

        let values: Vec<String> = self
            .option_slots
            .iter()
            .map(|slot| {
                let value = slot.header.as_deref().map(|h| row.text(h)).unwrap_or_default();
                if is_placeholder(&value) {
                    String::new()
                } else {
                    value
                }
            })
            .collect();

        if values.iter().all(String::is_empty) {
            return VariantOptions::None;
        }
        if values[0].is_empty() {
            return VariantOptions::Skip;
        }

        VariantOptions::Slots(
            self.option_slots
                .iter()
                .zip(values)
                .map(|(slot, value)| {
                    if value.is_empty() {
                        (String::new(), String::new())
                    } else {
                        (slot.name.clone(), value)
                    }
                })
                .collect(),
        )
    }

    /// SKU без формулы: артикул поставщика либо синтез из типа, модели и опций
    pub fn fallback_sku(
        &self,
        row: &SourceRow<'_>,
        product_type: &str,
        model: &str,
        options: &VariantOptions,
    ) -> String {
        if self.columns.contains(CanonicalField::ArticleNumber) {
            let part_number = self.field_text(row, CanonicalField::ArticleNumber);
            if !is_placeholder(&part_number) {
                return part_number;
            }
        }
        let mut parts = vec![product_type, model];
        parts.extend(options.values());
        synthesize_sku(parts)
    }
}
