use serde::{Deserialize, Serialize};

use crate::enums::OutputMode;

/// Заголовки CSV импорта Shopify.
/// Порядок и написание фиксированы: Shopify сопоставляет колонки по имени.
pub const SHOPIFY_HEADERS: [&str; 51] = [
    "Handle",
    "Title",
    "Body (HTML)",
    "Vendor",
    "Type",
    "Tags",
    "Published",
    "Option1 Name",
    "Option1 Value",
    "Option2 Name",
    "Option2 Value",
    "Option3 Name",
    "Option3 Value",
    "Variant SKU",
    "Variant Grams",
    "Variant Inventory Tracker",
    "Variant Inventory Qty",
    "Variant Inventory Policy",
    "Variant Fulfillment Service",
    "Variant Price",
    "Variant Compare At Price",
    "Variant Requires Shipping",
    "Variant Taxable",
    "Variant Barcode",
    "Product Category",
    "Image Src",
    "Image Position",
    "Image Alt Text",
    "Gift Card",
    "SEO Title",
    "SEO Description",
    "Google Shopping / Google Product Category",
    "Google Shopping / Gender",
    "Google Shopping / Age Group",
    "Google Shopping / MPN",
    "Google Shopping / AdWords Grouping",
    "Google Shopping / AdWords Labels",
    "Google Shopping / Condition",
    "Google Shopping / Custom Product",
    "Google Shopping / Custom Label 0",
    "Google Shopping / Custom Label 1",
    "Google Shopping / Custom Label 2",
    "Google Shopping / Custom Label 3",
    "Google Shopping / Custom Label 4",
    "Variant Image",
    "Variant Weight Unit",
    "Variant Tax Code",
    "Cost per item",
    "Price / International",
    "Compare At Price / International",
    "Status",
];

/// Заголовки выгрузки "только описания"
pub const DESCRIPTION_ONLY_HEADERS: [&str; 2] = ["Handle", "Body (HTML)"];

/// Заголовки для выбранного режима выгрузки
pub fn headers_for(mode: OutputMode) -> &'static [&'static str] {
    match mode {
        OutputMode::Full => &SHOPIFY_HEADERS,
        OutputMode::DescriptionOnly => &DESCRIPTION_ONLY_HEADERS,
    }
}

/// Является ли имя колонкой целевой схемы Shopify
pub fn is_shopify_header(name: &str) -> bool {
    SHOPIFY_HEADERS.contains(&name)
}

/// Одна строка CSV импорта Shopify.
/// Все поля строковые; незаполненные поля - пустая строка.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub handle: String,
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub published: String,
    pub option1_name: String,
    pub option1_value: String,
    pub option2_name: String,
    pub option2_value: String,
    pub option3_name: String,
    pub option3_value: String,
    pub variant_sku: String,
    pub variant_grams: String,
    pub variant_inventory_tracker: String,
    pub variant_inventory_qty: String,
    pub variant_inventory_policy: String,
    pub variant_fulfillment_service: String,
    pub variant_price: String,
    pub variant_compare_at_price: String,
    pub variant_requires_shipping: String,
    pub variant_taxable: String,
    pub variant_barcode: String,
    pub product_category: String,
    pub image_src: String,
    pub image_position: String,
    pub image_alt_text: String,
    pub gift_card: String,
    pub seo_title: String,
    pub seo_description: String,
    pub google_product_category: String,
    pub google_gender: String,
    pub google_age_group: String,
    pub google_mpn: String,
    pub google_adwords_grouping: String,
    pub google_adwords_labels: String,
    pub google_condition: String,
    pub google_custom_product: String,
    pub google_custom_label_0: String,
    pub google_custom_label_1: String,
    pub google_custom_label_2: String,
    pub google_custom_label_3: String,
    pub google_custom_label_4: String,
    pub variant_image: String,
    pub variant_weight_unit: String,
    pub variant_tax_code: String,
    pub cost_per_item: String,
    pub price_international: String,
    pub compare_at_price_international: String,
    pub status: String,
}

impl CanonicalRecord {
    /// Значения в порядке `SHOPIFY_HEADERS`
    pub fn values(&self) -> [&str; 51] {
        [
            self.handle.as_str(),
            self.title.as_str(),
            self.body_html.as_str(),
            self.vendor.as_str(),
            self.product_type.as_str(),
            self.tags.as_str(),
            self.published.as_str(),
            self.option1_name.as_str(),
            self.option1_value.as_str(),
            self.option2_name.as_str(),
            self.option2_value.as_str(),
            self.option3_name.as_str(),
            self.option3_value.as_str(),
            self.variant_sku.as_str(),
            self.variant_grams.as_str(),
            self.variant_inventory_tracker.as_str(),
            self.variant_inventory_qty.as_str(),
            self.variant_inventory_policy.as_str(),
            self.variant_fulfillment_service.as_str(),
            self.variant_price.as_str(),
            self.variant_compare_at_price.as_str(),
            self.variant_requires_shipping.as_str(),
            self.variant_taxable.as_str(),
            self.variant_barcode.as_str(),
            self.product_category.as_str(),
            self.image_src.as_str(),
            self.image_position.as_str(),
            self.image_alt_text.as_str(),
            self.gift_card.as_str(),
            self.seo_title.as_str(),
            self.seo_description.as_str(),
            self.google_product_category.as_str(),
            self.google_gender.as_str(),
            self.google_age_group.as_str(),
            self.google_mpn.as_str(),
            self.google_adwords_grouping.as_str(),
            self.google_adwords_labels.as_str(),
            self.google_condition.as_str(),
            self.google_custom_product.as_str(),
            self.google_custom_label_0.as_str(),
            self.google_custom_label_1.as_str(),
            self.google_custom_label_2.as_str(),
            self.google_custom_label_3.as_str(),
            self.google_custom_label_4.as_str(),
            self.variant_image.as_str(),
            self.variant_weight_unit.as_str(),
            self.variant_tax_code.as_str(),
            self.cost_per_item.as_str(),
            self.price_international.as_str(),
            self.compare_at_price_international.as_str(),
            self.status.as_str(),
        ]
    }

    /// Проекция записи на колонки выбранного режима.
    /// Режим влияет только на набор колонок, не на вычисленные значения.
    pub fn project(&self, mode: OutputMode) -> Vec<&str> {
        match mode {
            OutputMode::Full => self.values().to_vec(),
            OutputMode::DescriptionOnly => vec![self.handle.as_str(), self.body_html.as_str()],
        }
    }

    /// Значение по имени колонки Shopify
    pub fn get(&self, header: &str) -> Option<&str> {
        SHOPIFY_HEADERS
            .iter()
            .position(|h| *h == header)
            .map(|idx| self.values()[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_headers_are_unique() {
        let unique: HashSet<_> = SHOPIFY_HEADERS.iter().collect();
        assert_eq!(unique.len(), SHOPIFY_HEADERS.len());
    }

    #[test]
    fn test_project_description_only_has_two_columns() {
        let record = CanonicalRecord {
            handle: "pump-a".to_string(),
            title: "Pump A".to_string(),
            body_html: "<p>body</p>".to_string(),
            ..Default::default()
        };

        let projected = record.project(OutputMode::DescriptionOnly);
        assert_eq!(projected, vec!["pump-a", "<p>body</p>"]);
        assert_eq!(projected.len(), headers_for(OutputMode::DescriptionOnly).len());
        assert_eq!(
            record.project(OutputMode::Full).len(),
            headers_for(OutputMode::Full).len()
        );
    }

    #[test]
    fn test_get_by_header() {
        let record = CanonicalRecord {
            variant_sku: "SKU-1".to_string(),
            status: "draft".to_string(),
            ..Default::default()
        };
        assert_eq!(record.get("Variant SKU"), Some("SKU-1"));
        assert_eq!(record.get("Status"), Some("draft"));
        assert_eq!(record.get("Title"), Some(""));
        assert_eq!(record.get("Unknown"), None);
    }
}
