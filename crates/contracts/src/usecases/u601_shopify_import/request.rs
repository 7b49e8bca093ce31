use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Настройки одного запуска выгрузки (formulas.toml / formulas.json).
///
/// Плоская структура ключ/значение. Неизвестные ключи игнорируются,
/// отсутствующие берутся из `Default`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Формула розничной цены (строгий режим)
    pub pricing_formula: String,
    /// Формула себестоимости (строгий режим)
    pub cost_formula: String,
    /// Формула перевода веса в граммы (строгий режим)
    pub grams_formula: String,

    pub vendor_formula: String,
    pub product_type_formula: String,
    pub title_formula: String,
    /// Если не задана - "vendor, collection" из непустых частей
    pub tags_formula: Option<String>,
    pub seo_title_formula: String,
    pub seo_description_formula: String,
    /// Переопределение генерации SKU
    pub sku_formula: Option<String>,

    /// Порог веса (lbs) для уведомления о доплате за доставку
    pub weight_threshold: f64,

    pub vendor: String,
    pub product_type: String,
    pub collection: String,
    pub product_category: String,
    pub image_url: String,
    pub manufacturer_url: String,

    /// До трех полей-опций варианта, по порядку Option1..Option3
    pub variant_option_fields: Vec<String>,
    /// Поля, выводимые первыми в описании
    pub description_include_columns: Vec<String>,
    /// Поля, исключаемые из описания
    pub description_exclude_columns: Vec<String>,
    /// Канонические поля (или заголовки), без которых запуск прерывается
    pub required_columns: Vec<String>,
    /// Переопределение синонимов канонических полей
    pub column_aliases: BTreeMap<String, Vec<String>>,

    /// Цифровой товар: без веса и доставки
    pub digital: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            pricing_formula: "list_price * 0.36 * 1.21".to_string(),
            cost_formula: "list_price * 0.36".to_string(),
            grams_formula: "int(round(weight * 453.592))".to_string(),
            vendor_formula: "vendor".to_string(),
            product_type_formula: "product_type".to_string(),
            title_formula: "model".to_string(),
            tags_formula: None,
            seo_title_formula: "title".to_string(),
            seo_description_formula: "f\"Buy {title} online.\"".to_string(),
            sku_formula: None,
            weight_threshold: 150.0,
            vendor: String::new(),
            product_type: String::new(),
            collection: String::new(),
            product_category: String::new(),
            image_url: String::new(),
            manufacturer_url: "https://wilo.com/en/overview.html".to_string(),
            variant_option_fields: vec!["Voltage".to_string()],
            description_include_columns: vec![
                "Model".to_string(),
                "Voltage".to_string(),
                "Power".to_string(),
            ],
            description_exclude_columns: Vec::new(),
            required_columns: [
                "Model",
                "Voltage",
                "Power",
                "Weight",
                "List Price",
                "Article Number",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            column_aliases: BTreeMap::new(),
            digital: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "pricing_formula": "list_price * 0.5",
            "weight_threshold": 200,
            "variant_option_fields": ["Voltage", "Phase"],
            "some_unknown_key": true
        }"#;

        let config: ImportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pricing_formula, "list_price * 0.5");
        assert_eq!(config.weight_threshold, 200.0);
        assert_eq!(config.variant_option_fields, vec!["Voltage", "Phase"]);
        assert_eq!(config.cost_formula, "list_price * 0.36");
        assert!(config.sku_formula.is_none());
        assert!(!config.digital);
    }
}
