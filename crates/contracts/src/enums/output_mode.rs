use serde::{Deserialize, Serialize};

/// Режим выгрузки итогового файла
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Полный набор колонок импорта Shopify
    #[default]
    Full,
    /// Только Handle + Body (HTML)
    DescriptionOnly,
}

impl OutputMode {
    /// Получить код режима
    pub fn code(&self) -> &'static str {
        match self {
            OutputMode::Full => "full",
            OutputMode::DescriptionOnly => "description-only",
        }
    }

    /// Получить человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputMode::Full => "Full Shopify CSV (all fields)",
            OutputMode::DescriptionOnly => "Description-only (Handle + HTML body)",
        }
    }

    /// Префикс имени выгружаемого файла
    pub fn file_prefix(&self) -> &'static str {
        match self {
            OutputMode::Full => "shopify_import",
            OutputMode::DescriptionOnly => "shopify_descriptions",
        }
    }

    /// Получить все режимы
    pub fn all() -> Vec<OutputMode> {
        vec![OutputMode::Full, OutputMode::DescriptionOnly]
    }

    /// Парсинг из строки
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "full" => Some(OutputMode::Full),
            "description-only" | "description_only" => Some(OutputMode::DescriptionOnly),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for mode in OutputMode::all() {
            assert_eq!(OutputMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(OutputMode::from_code("csv"), None);
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&OutputMode::DescriptionOnly).unwrap();
        assert_eq!(json, "\"description-only\"");
    }
}
