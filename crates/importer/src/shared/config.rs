use anyhow::Context;
use contracts::usecases::u601_shopify_import::ImportConfig;
use std::path::{Path, PathBuf};

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
pricing_formula = "list_price * 0.36 * 1.21"
cost_formula = "list_price * 0.36"
grams_formula = "int(round(weight * 453.592))"
vendor_formula = "vendor"
product_type_formula = "product_type"
title_formula = "model"
seo_title_formula = "title"
seo_description_formula = 'f"Buy {title} online."'
weight_threshold = 150.0
manufacturer_url = "https://wilo.com/en/overview.html"
variant_option_fields = ["Voltage"]
description_include_columns = ["Model", "Voltage", "Power"]
description_exclude_columns = []
required_columns = ["Model", "Voltage", "Power", "Weight", "List Price", "Article Number"]
digital = false
"#;

const CONFIG_FILE_NAMES: [&str; 2] = ["formulas.toml", "formulas.json"];

/// Load the import configuration
///
/// Search order:
/// 1. Explicit `--config` path (must exist)
/// 2. formulas.toml / formulas.json next to the executable
/// 3. formulas.toml / formulas.json in the current directory
/// 4. Falls back to embedded default config
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<ImportConfig> {
    if let Some(path) = explicit {
        tracing::info!("Loading config from: {}", path.display());
        return read_config_file(path);
    }

    for path in candidate_paths() {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            return read_config_file(&path);
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: ImportConfig = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

/// Reads TOML or JSON depending on the file extension
pub fn read_config_file(path: &Path) -> anyhow::Result<ImportConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> anyhow::Result<ImportConfig> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: ImportConfig = if is_json {
        serde_json::from_str(contents)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        toml::from_str(contents).with_context(|| format!("Invalid TOML in {}", path.display()))?
    };

    if config.variant_option_fields.len() > 3 {
        tracing::warn!(
            "variant_option_fields has {} entries, only the first 3 are used",
            config.variant_option_fields.len()
        );
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_matches_struct_default() {
        let config: ImportConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn test_toml_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formulas.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "vendor = \"Wilo\"").unwrap();
        writeln!(file, "digital = true").unwrap();
        writeln!(file, "[column_aliases]").unwrap();
        writeln!(file, "Model = [\"Pump\"]").unwrap();
        drop(file);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.vendor, "Wilo");
        assert!(config.digital);
        assert_eq!(config.column_aliases["Model"], vec!["Pump"]);
        assert_eq!(config.pricing_formula, "list_price * 0.36 * 1.21");
    }

    #[test]
    fn test_json_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formulas.json");
        std::fs::write(&path, r#"{"sku_formula": "f\"{model}-X\"", "weight_threshold": 99.5}"#)
            .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sku_formula.as_deref(), Some("f\"{model}-X\""));
        assert_eq!(config.weight_threshold, 99.5);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
