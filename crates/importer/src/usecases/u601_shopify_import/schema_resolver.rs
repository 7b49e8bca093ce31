//! Maps canonical catalog fields onto the headers of a supplier table.
//!
//! Aliases are tried in configured order; for each alias the headers are
//! scanned in table order and the first header with a token-set similarity
//! of at least [`MATCH_THRESHOLD`] is taken. A case-insensitive exact match
//! on any alias wins before the fuzzy scan starts.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Минимальная оценка сходства для сопоставления заголовка
pub const MATCH_THRESHOLD: u32 = 70;

/// Канонические поля каталога
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Model,
    Voltage,
    Power,
    Weight,
    ListPrice,
    ArticleNumber,
}

impl CanonicalField {
    pub fn all() -> [CanonicalField; 6] {
        [
            CanonicalField::Model,
            CanonicalField::Voltage,
            CanonicalField::Power,
            CanonicalField::Weight,
            CanonicalField::ListPrice,
            CanonicalField::ArticleNumber,
        ]
    }

    /// Имя поля в настройках и сообщениях
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Model => "Model",
            CanonicalField::Voltage => "Voltage",
            CanonicalField::Power => "Power",
            CanonicalField::Weight => "Weight",
            CanonicalField::ListPrice => "List Price",
            CanonicalField::ArticleNumber => "Article Number",
        }
    }

    /// Имя переменной в контексте формул
    pub fn context_key(&self) -> &'static str {
        match self {
            CanonicalField::Model => "model",
            CanonicalField::Voltage => "voltage",
            CanonicalField::Power => "power",
            CanonicalField::Weight => "weight",
            CanonicalField::ListPrice => "list_price",
            CanonicalField::ArticleNumber => "part_number",
        }
    }

    pub fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Model => &["Model", "Product Name", "Item Name"],
            CanonicalField::Voltage => &["Voltage", "Power Spec"],
            CanonicalField::Power => &["Power HP", "Horsepower", "Individual Pump Power (HP)"],
            CanonicalField::Weight => &["Weight lbs", "Product Weight"],
            CanonicalField::ListPrice => &["List Price", "Base Price"],
            CanonicalField::ArticleNumber => &["Article Number", "Part Number", "SKU", "Item Code"],
        }
    }

    /// Accepts "List Price", "list_price", "ListPrice" and the like
    pub fn parse(name: &str) -> Option<Self> {
        let key = squash(name);
        Self::all().into_iter().find(|field| {
            squash(field.name()) == key || squash(field.context_key()) == key
        })
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Списки синонимов по каноническим полям
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let aliases = CanonicalField::all()
            .into_iter()
            .map(|field| {
                let list = field.default_aliases().iter().map(|s| s.to_string()).collect();
                (field, list)
            })
            .collect();
        Self { aliases }
    }
}

impl AliasTable {
    /// Defaults with per-field replacements from `column_aliases`
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table = Self::default();
        for (key, list) in overrides {
            match CanonicalField::parse(key) {
                Some(field) => {
                    table.aliases.insert(field, list.clone());
                }
                None => tracing::warn!("column_aliases: unknown canonical field '{}' ignored", key),
            }
        }
        table
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Сопоставление канонических полей заголовкам таблицы
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    mapping: BTreeMap<CanonicalField, String>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.mapping.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: CanonicalField, header: impl Into<String>) {
        self.mapping.insert(field, header.into());
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.mapping.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.mapping.iter().map(|(f, h)| (*f, h.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Missing required columns: {missing:?}\nColumns found: {available:?}")]
pub struct SchemaResolutionError {
    pub missing: Vec<String>,
    pub available: Vec<String>,
}

/// Сопоставляет поля заголовкам. Ошибка, если не найдено хотя бы одно
/// обязательное поле; `required` может содержать и буквальные заголовки.
pub fn resolve_columns(
    headers: &[String],
    aliases: &AliasTable,
    required: &[String],
) -> Result<ColumnMap, SchemaResolutionError> {
    let mut map = ColumnMap::default();

    for field in CanonicalField::all() {
        let candidates = aliases.aliases(field);
        if let Some(header) = exact_match(candidates, headers).or_else(|| fuzzy_match(candidates, headers)) {
            tracing::debug!("Column '{}' mapped to '{}'", field.name(), header);
            map.insert(field, header);
        }
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|name| match CanonicalField::parse(name) {
            Some(field) => !map.contains(field),
            None => !headers.iter().any(|h| h.trim().eq_ignore_ascii_case(name.trim())),
        })
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(SchemaResolutionError {
            missing,
            available: headers.to_vec(),
        });
    }
    Ok(map)
}

fn exact_match(aliases: &[String], headers: &[String]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .find(|h| h.trim().eq_ignore_ascii_case(alias.trim()))
            .cloned()
    })
}

fn fuzzy_match(aliases: &[String], headers: &[String]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .find(|h| token_set_ratio(alias, h) >= MATCH_THRESHOLD)
            .cloned()
    })
}

/// Lowercase, every non-word character replaced by a space
fn process(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Оценка сходства 0..100 по множествам слов, без учета порядка и повторов
pub fn token_set_ratio(a: &str, b: &str) -> u32 {
    let pa = process(a);
    let pb = process(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }

    let ta: BTreeSet<&str> = pa.split_whitespace().collect();
    let tb: BTreeSet<&str> = pb.split_whitespace().collect();

    let intersection = ta.intersection(&tb).copied().collect::<Vec<_>>().join(" ");
    let diff_ab = ta.difference(&tb).copied().collect::<Vec<_>>().join(" ");
    let diff_ba = tb.difference(&ta).copied().collect::<Vec<_>>().join(" ");

    let combined_ab = join_nonempty(&intersection, &diff_ab);
    let combined_ba = join_nonempty(&intersection, &diff_ba);

    [
        ratio(&intersection, &combined_ab),
        ratio(&intersection, &combined_ba),
        ratio(&combined_ab, &combined_ba),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

fn join_nonempty(a: &str, b: &str) -> String {
    format!("{} {}", a, b).trim().to_string()
}

/// round(100 * 2*LCS / (|x| + |y|)), 0 for an empty side
fn ratio(x: &str, y: &str) -> u32 {
    let xs: Vec<char> = x.chars().collect();
    let ys: Vec<char> = y.chars().collect();
    if xs.is_empty() || ys.is_empty() {
        return 0;
    }

    let lcs = lcs_len(&xs, &ys);
    let score = 100.0 * 2.0 * lcs as f64 / (xs.len() + ys.len()) as f64;
    score.round_ties_even() as u32
}

fn lcs_len(xs: &[char], ys: &[char]) -> usize {
    let mut prev = vec![0usize; ys.len() + 1];
    let mut curr = vec![0usize; ys.len() + 1];
    for x in xs {
        for (j, y) in ys.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[ys.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn all_required() -> Vec<String> {
        CanonicalField::all().iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_token_set_ratio_scores() {
        assert_eq!(token_set_ratio("Weight lbs", "Weight (kg)"), 80);
        assert_eq!(token_set_ratio("Power HP", "Individual Pump Power (HP)"), 100);
        assert_eq!(token_set_ratio("model", "MODEL"), 100);
        assert!(token_set_ratio("Model", "Voltage") < MATCH_THRESHOLD);
        assert_eq!(token_set_ratio("", "Model"), 0);
        assert_eq!(token_set_ratio("---", "Model"), 0);
    }

    #[test]
    fn test_exact_headers_are_selected() {
        let table = headers(&[
            "Model",
            "Voltage",
            "Power HP",
            "Weight lbs",
            "List Price",
            "Article Number",
        ]);
        let map = resolve_columns(&table, &AliasTable::default(), &all_required()).unwrap();
        assert_eq!(map.iter().count(), 6);
        for field in CanonicalField::all() {
            let header = map.get(field).unwrap();
            assert!(field.default_aliases().contains(&header));
        }
    }

    #[test]
    fn test_exact_match_beats_earlier_fuzzy_candidate() {
        // "Power Spec Rating" passes the fuzzy threshold for "Voltage"'s second alias,
        // but the exact header "Power Spec" must win.
        let table = headers(&["Power Spec Rating", "Power Spec"]);
        let map = resolve_columns(&table, &AliasTable::default(), &[]).unwrap();
        assert_eq!(map.get(CanonicalField::Voltage), Some("Power Spec"));
    }

    #[test]
    fn test_fuzzy_supplier_headers() {
        let table = headers(&[
            "Product Name",
            "Voltage (V)",
            "Individual Pump Power (HP)",
            "Weight (lbs)",
            "List Price USD",
            "Part Number",
        ]);
        let map = resolve_columns(&table, &AliasTable::default(), &all_required()).unwrap();
        assert_eq!(map.get(CanonicalField::Model), Some("Product Name"));
        assert_eq!(map.get(CanonicalField::Power), Some("Individual Pump Power (HP)"));
        assert_eq!(map.get(CanonicalField::Weight), Some("Weight (lbs)"));
        assert_eq!(map.get(CanonicalField::ListPrice), Some("List Price USD"));
        assert_eq!(map.get(CanonicalField::ArticleNumber), Some("Part Number"));
    }

    #[test]
    fn test_missing_required_is_fatal() {
        let table = headers(&["Model", "Voltage", "Colour"]);
        let err = resolve_columns(&table, &AliasTable::default(), &all_required()).unwrap_err();
        assert_eq!(err.missing, vec!["Power", "Weight", "List Price", "Article Number"]);
        assert_eq!(err.available, table);
        assert!(err.to_string().starts_with("Missing required columns: [\"Power\""));
    }

    #[test]
    fn test_literal_required_header() {
        let table = headers(&["Model", "Phase"]);
        let required = vec!["Model".to_string(), "phase".to_string()];
        assert!(resolve_columns(&table, &AliasTable::default(), &required).is_ok());

        let required = vec!["Frequency".to_string()];
        let err = resolve_columns(&table, &AliasTable::default(), &required).unwrap_err();
        assert_eq!(err.missing, vec!["Frequency"]);
    }

    #[test]
    fn test_alias_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("list_price".to_string(), vec!["MSRP".to_string()]);
        overrides.insert("Colour".to_string(), vec!["Color".to_string()]);
        let aliases = AliasTable::with_overrides(&overrides);
        assert_eq!(aliases.aliases(CanonicalField::ListPrice), ["MSRP".to_string()]);
        assert_eq!(aliases.aliases(CanonicalField::Model).len(), 3);

        let table = headers(&["List Price", "MSRP"]);
        let map = resolve_columns(&table, &aliases, &[]).unwrap();
        assert_eq!(map.get(CanonicalField::ListPrice), Some("MSRP"));
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!(CanonicalField::parse("List Price"), Some(CanonicalField::ListPrice));
        assert_eq!(CanonicalField::parse("ListPrice"), Some(CanonicalField::ListPrice));
        assert_eq!(CanonicalField::parse("part_number"), Some(CanonicalField::ArticleNumber));
        assert_eq!(CanonicalField::parse("article number"), Some(CanonicalField::ArticleNumber));
        assert_eq!(CanonicalField::parse("Phase"), None);
    }
}
