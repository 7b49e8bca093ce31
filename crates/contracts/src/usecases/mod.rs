pub mod common;
pub mod u601_shopify_import;
