pub mod shopify_schema;
