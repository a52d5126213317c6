mod claude;
mod gemini;
mod local;
mod openai;

use chrono::{DateTime, Local};
use serde_json::Value;
use text2cal_types::EventDetails;

pub use claude::ClaudeParser;
pub use gemini::GeminiParser;
pub use local::{LOCAL_TITLE, LocalParser};
pub use openai::OpenAiParser;

use crate::ProviderError;

/// Shared extraction prompt. The current wall-clock time is embedded so
/// relative dates resolve against the moment of capture.
pub fn build_prompt(text: &str, now: DateTime<Local>) -> String {
    format!(
        "Your task is to analyze ONLY the text provided below and extract event details into a \
         single raw JSON object with keys: \"title\", \"start\", \"end\", \"location\", \"hasTime\". \
         The current date is {}. Format dates as local ISO 8601 strings (e.g., \"2025-09-23T17:30:00\"). \
         Set \"hasTime\" to false when the text names no time of day. \
         If info is missing, use null. --- {} ---",
        now.format("%a %b %d %Y %H:%M:%S GMT%z"),
        text
    )
}

/// Decodes the model's JSON answer into event fields
pub(crate) fn decode_event(provider: &str, raw: &str) -> Result<EventDetails, ProviderError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ProviderError::protocol(provider, format!("answer is not JSON: {e}")))?;

    serde_json::from_value(value)
        .map_err(|e| ProviderError::protocol(provider, format!("answer has the wrong shape: {e}")))
}
