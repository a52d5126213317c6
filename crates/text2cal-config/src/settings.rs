use std::fmt;

use serde::{Deserialize, Serialize};
use text2cal_types::{OcrProviderId, ParserId};

fn default_ocr_method() -> String {
    OcrProviderId::Local.as_str().to_string()
}

fn default_parse_method() -> String {
    ParserId::Local.as_str().to_string()
}

/// User settings as persisted by the configuration surface. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_ocr_method")]
    pub ocr_method: String,
    #[serde(default = "default_parse_method")]
    pub parse_method: String,
    #[serde(default)]
    pub api_keys: ApiKeys,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr_method: default_ocr_method(),
            parse_method: default_parse_method(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl Settings {
    /// Stored OCR method, blank meaning the default. Not validated.
    pub fn selected_ocr_method(&self) -> &str {
        non_blank(&self.ocr_method).unwrap_or(OcrProviderId::Local.as_str())
    }

    pub fn selected_parse_method(&self) -> &str {
        non_blank(&self.parse_method).unwrap_or(ParserId::Local.as_str())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Provider credentials. `Debug` only reports which keys are present.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: String,
    pub claude: String,
    pub gemini: String,
    pub google: String,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &!self.openai.is_empty())
            .field("claude", &!self.claude.is_empty())
            .field("gemini", &!self.gemini.is_empty())
            .field("google", &!self.google.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_keys_resolve_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.selected_ocr_method(), "local");
        assert_eq!(settings.selected_parse_method(), "local");
        assert!(settings.api_keys.openai.is_empty());

        let settings: Settings =
            serde_json::from_str(r#"{"ocrMethod":"  ","parseMethod":" gemini "}"#).unwrap();
        assert_eq!(settings.selected_ocr_method(), "local");
        assert_eq!(settings.selected_parse_method(), "gemini");
    }

    #[test]
    fn test_legacy_tesseract_method() {
        let settings: Settings =
            serde_json::from_str(r#"{"ocrMethod":"tesseract","parseMethod":"claude"}"#).unwrap();
        let ocr: OcrProviderId = settings.selected_ocr_method().parse().unwrap();
        let parser: ParserId = settings.selected_parse_method().parse().unwrap();
        assert_eq!(ocr, OcrProviderId::Local);
        assert_eq!(parser, ParserId::Claude);
    }

    #[test]
    fn test_unknown_method_is_passed_through() {
        let settings = Settings {
            parse_method: "mystery".into(),
            ..Settings::default()
        };
        assert_eq!(settings.selected_parse_method(), "mystery");
        assert!(settings.selected_parse_method().parse::<ParserId>().is_err());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let keys = ApiKeys {
            openai: "sk-secret".into(),
            ..ApiKeys::default()
        };
        let printed = format!("{keys:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("openai: true"));
    }
}
