//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use contracts::enums::OutputMode;
use contracts::usecases::u601_shopify_import::ImportConfig;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Full Shopify CSV (all fields)
    Full,
    /// Handle + Body (HTML) only
    DescriptionOnly,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => OutputMode::Full,
            ModeArg::DescriptionOnly => OutputMode::DescriptionOnly,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shopify-importer")]
#[command(about = "Convert a supplier spreadsheet into a Shopify product import CSV")]
#[command(version)]
pub struct Cli {
    /// Supplier file (.csv, .xls, .xlsx, .xlsm, .xlsb, .ods).
    /// Without it the only spreadsheet in the current directory is used.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// formulas.toml / formulas.json; searched next to the binary and in the current directory otherwise
    #[arg(short, long, env = "SHOPIFY_IMPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: ModeArg,

    /// Digital products: no weight, no shipping
    #[arg(long)]
    pub digital: bool,

    #[arg(long)]
    pub vendor: Option<String>,

    #[arg(long)]
    pub product_type: Option<String>,

    /// Collection, also used as a tag
    #[arg(long)]
    pub collection: Option<String>,

    /// Default image URL for the primary variant
    #[arg(long)]
    pub image_url: Option<String>,

    #[arg(long)]
    pub product_category: Option<String>,

    #[arg(short, long, default_value = "exports")]
    pub output_dir: PathBuf,
}

impl Cli {
    /// Flags win over the config file
    pub fn apply_overrides(&self, config: &mut ImportConfig) {
        let overrides = [
            (&self.vendor, &mut config.vendor),
            (&self.product_type, &mut config.product_type),
            (&self.collection, &mut config.collection),
            (&self.image_url, &mut config.image_url),
            (&self.product_category, &mut config.product_category),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                *field = value.trim().to_string();
            }
        }
        if self.digital {
            config.digital = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_override() {
        let cli = Cli::parse_from([
            "shopify-importer",
            "--input",
            "wilo.xlsx",
            "--mode",
            "description-only",
            "--vendor",
            " Wilo ",
            "--digital",
        ]);
        assert_eq!(OutputMode::from(cli.mode), OutputMode::DescriptionOnly);
        assert_eq!(cli.output_dir, PathBuf::from("exports"));

        let mut config = ImportConfig {
            collection: "Pumps".to_string(),
            ..ImportConfig::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.vendor, "Wilo");
        assert_eq!(config.collection, "Pumps");
        assert!(config.digital);
    }
}
