use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Smallest drag, in logical pixels, that still counts as a selection
pub const MIN_SELECTION_PX: f64 = 10.0;

/// Selected area in page-viewport logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Physical pixels per logical pixel at capture time
    pub device_scale: f64,
}

/// Event fields extracted by a parser
///
/// `start` / `end` are local-time ISO-8601 strings. Only an explicit
/// `hasTime: false` marks an all-day event; a missing flag means timed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ParsedEvent")]
pub struct EventDetails {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub has_time: Option<bool>,
}

/// Parser answer as received. Some models reply with `startDate` /
/// `endDate`, sometimes next to a null `start` / `end`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedEvent {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    has_time: Option<bool>,
}

impl From<ParsedEvent> for EventDetails {
    fn from(raw: ParsedEvent) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            title: raw.title,
            start: present(raw.start).or(raw.start_date),
            end: present(raw.end).or(raw.end_date),
            location: raw.location,
            has_time: raw.has_time,
        }
    }
}

impl EventDetails {
    pub fn is_all_day(&self) -> bool {
        self.has_time == Some(false)
    }
}

/// Correlation token carried by every provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {family} provider: {id}")]
pub struct UnknownProvider {
    pub family: &'static str,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OcrProviderId {
    #[serde(rename = "local", alias = "tesseract")]
    Local,
    #[serde(rename = "google-vision")]
    GoogleVision,
    #[serde(rename = "openai-vision")]
    OpenAiVision,
    #[serde(rename = "claude-vision")]
    ClaudeVision,
    #[serde(rename = "gemini-vision")]
    GeminiVision,
}

impl OcrProviderId {
    pub const ALL: [OcrProviderId; 5] = [
        OcrProviderId::Local,
        OcrProviderId::GoogleVision,
        OcrProviderId::OpenAiVision,
        OcrProviderId::ClaudeVision,
        OcrProviderId::GeminiVision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrProviderId::Local => "local",
            OcrProviderId::GoogleVision => "google-vision",
            OcrProviderId::OpenAiVision => "openai-vision",
            OcrProviderId::ClaudeVision => "claude-vision",
            OcrProviderId::GeminiVision => "gemini-vision",
        }
    }
}

impl fmt::Display for OcrProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" | "tesseract" => Ok(OcrProviderId::Local),
            "google-vision" => Ok(OcrProviderId::GoogleVision),
            "openai-vision" => Ok(OcrProviderId::OpenAiVision),
            "claude-vision" => Ok(OcrProviderId::ClaudeVision),
            "gemini-vision" => Ok(OcrProviderId::GeminiVision),
            other => Err(UnknownProvider {
                family: "OCR",
                id: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserId {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    Claude,
}

impl ParserId {
    pub const ALL: [ParserId; 4] = [
        ParserId::Local,
        ParserId::OpenAi,
        ParserId::Gemini,
        ParserId::Claude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserId::Local => "local",
            ParserId::OpenAi => "openai",
            ParserId::Gemini => "gemini",
            ParserId::Claude => "claude",
        }
    }
}

impl fmt::Display for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" => Ok(ParserId::Local),
            "openai" => Ok(ParserId::OpenAi),
            "gemini" => Ok(ParserId::Gemini),
            "claude" => Ok(ParserId::Claude),
            other => Err(UnknownProvider {
                family: "parse",
                id: other.to_string(),
            }),
        }
    }
}

/// Image handed to an OCR provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// `data:<mime>;base64,<data>`
    Inline { mime: String, base64: String },
    /// Externally reachable URL
    Remote(String),
}

impl ImageRef {
    pub fn parse(reference: &str) -> Self {
        let Some(rest) = reference.strip_prefix("data:") else {
            return ImageRef::Remote(reference.to_string());
        };

        let (header, data) = rest.split_once(',').unwrap_or(("", rest));
        let mime = header
            .strip_suffix(";base64")
            .filter(|m| !m.is_empty())
            .unwrap_or("image/png");

        ImageRef::Inline {
            mime: mime.to_string(),
            base64: data.to_string(),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageRef::Inline { .. })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Inline { mime, base64 } => write!(f, "data:{mime};base64,{base64}"),
            ImageRef::Remote(url) => f.write_str(url),
        }
    }
}

/// Copy of an outbound provider request, kept for diagnostics only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl DebugTrace {
    pub fn local(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            endpoint: None,
            payload: None,
        }
    }

    pub fn request(
        provider: impl Into<String>,
        model: Option<&str>,
        endpoint: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.map(str::to_string),
            endpoint: Some(endpoint.into()),
            payload: Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_falls_back_to_date_keys() {
        let event: EventDetails = serde_json::from_str(
            r#"{"title":"x","start":null,"startDate":"2025-01-02","hasTime":false}"#,
        )
        .unwrap();
        assert_eq!(event.start.as_deref(), Some("2025-01-02"));
        assert_eq!(event.end, None);
        assert!(event.is_all_day());

        let event: EventDetails = serde_json::from_str(
            r#"{"start":"2025-01-02T09:00:00","startDate":"2025-01-03","endDate":"2025-01-04"}"#,
        )
        .unwrap();
        assert_eq!(event.start.as_deref(), Some("2025-01-02T09:00:00"));
        assert_eq!(event.end.as_deref(), Some("2025-01-04"));
        assert!(!event.is_all_day());
    }

    #[test]
    fn test_provider_ids_parse_with_alias() {
        assert_eq!("tesseract".parse::<OcrProviderId>().unwrap(), OcrProviderId::Local);
        assert_eq!(
            "gemini-vision".parse::<OcrProviderId>().unwrap(),
            OcrProviderId::GeminiVision
        );
        assert_eq!("openai".parse::<ParserId>().unwrap(), ParserId::OpenAi);

        let err = "bing".parse::<ParserId>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown parse provider: bing");
    }

    #[test]
    fn test_provider_id_serde_matches_as_str() {
        for id in OcrProviderId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        for id in ParserId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn test_image_ref_parse() {
        let inline = ImageRef::parse("data:image/jpeg;base64,AAAA");
        assert_eq!(
            inline,
            ImageRef::Inline {
                mime: "image/jpeg".into(),
                base64: "AAAA".into()
            }
        );
        assert_eq!(inline.to_string(), "data:image/jpeg;base64,AAAA");

        let remote = ImageRef::parse("https://example.com/a.png");
        assert!(!remote.is_inline());
    }

    #[test]
    fn test_event_details_all_day_only_on_explicit_false() {
        let timed: EventDetails =
            serde_json::from_str(r#"{"title":"x","start":"2025-09-23T17:30:00"}"#).unwrap();
        assert!(!timed.is_all_day());

        let all_day: EventDetails = serde_json::from_str(
            r#"{"title":null,"start":"2025-09-23T17:30:00","end":null,"location":null,"hasTime":false}"#,
        )
        .unwrap();
        assert!(all_day.is_all_day());
    }

    #[test]
    fn test_event_details_accepts_legacy_date_keys() {
        let details: EventDetails =
            serde_json::from_str(r#"{"startDate":"2025-01-02","endDate":"2025-01-03"}"#).unwrap();
        assert_eq!(details.start.as_deref(), Some("2025-01-02"));
        assert_eq!(details.end.as_deref(), Some("2025-01-03"));
    }
}
