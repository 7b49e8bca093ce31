pub mod request;
pub mod response;

pub use request::ImportConfig;
pub use response::{ImportReport, ImportStats, ValidationError};

use crate::usecases::common::UseCaseMetadata;

pub struct ShopifyImport;

impl UseCaseMetadata for ShopifyImport {
    fn usecase_index() -> &'static str {
        "u601"
    }

    fn usecase_name() -> &'static str {
        "shopify_import"
    }

    fn display_name() -> &'static str {
        "Shopify product import"
    }

    fn description() -> &'static str {
        "Supplier price list (CSV / Excel) to Shopify product import CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        assert_eq!(ShopifyImport::full_name(), "u601_shopify_import");
    }
}
