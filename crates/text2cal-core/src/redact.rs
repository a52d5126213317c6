//! Scrubbing of provider request traces before they are displayed or logged.
//!
//! Each known place an adapter puts an image or a prompt is a variant of a
//! closed enum. A variant walks its path with `Option` lookups and reports how
//! many values it replaced; a path that does not exist in a given payload is
//! simply skipped. Running any pass twice changes nothing the second time.

use serde_json::Value;
use text2cal_types::DebugTrace;

pub const BASE64_PLACEHOLDER: &str = "<base64 omitted>";
pub const DATA_URL_PLACEHOLDER: &str = "<data-url omitted>";
pub const KEY_PLACEHOLDER: &str = "<redacted>";
pub const TRUNCATION_MARKER: &str = "… [truncated]";

/// Per-field prompt budget, in characters
pub const PROMPT_BUDGET: usize = 1600;
/// Cap on a serialized trace at the log boundary, in characters
pub const LOG_BUDGET: usize = 4000;

/// Locations that can carry inline image data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveField {
    /// `requests[].image.content` (Google Vision)
    VisionContent,
    /// `requests[].image.source.imageUri` when it is a data URL
    VisionImageUri,
    /// `messages[].content[]` blocks of type `image_url` (OpenAI)
    ChatImageUrl,
    /// `messages[].content[]` blocks of type `image` (Claude)
    MessageImageSource,
    /// `contents[].parts[].inline_data.data` (Gemini)
    InlineData,
}

impl SensitiveField {
    pub const ALL: [SensitiveField; 5] = [
        SensitiveField::VisionContent,
        SensitiveField::VisionImageUri,
        SensitiveField::ChatImageUrl,
        SensitiveField::MessageImageSource,
        SensitiveField::InlineData,
    ];

    /// Replaces every match in `payload`, returning the number replaced
    pub fn redact(self, payload: &mut Value) -> usize {
        match self {
            SensitiveField::VisionContent => elements(payload.get_mut("requests"))
                .filter_map(|request| request.pointer_mut("/image/content"))
                .map(|slot| replace(slot, BASE64_PLACEHOLDER, |_| true))
                .filter(|&hit| hit)
                .count(),
            SensitiveField::VisionImageUri => elements(payload.get_mut("requests"))
                .filter_map(|request| request.pointer_mut("/image/source/imageUri"))
                .map(|slot| replace(slot, DATA_URL_PLACEHOLDER, is_data_url))
                .filter(|&hit| hit)
                .count(),
            SensitiveField::ChatImageUrl => content_blocks(payload)
                .filter(|block| block_type(block) == Some("image_url"))
                .filter_map(|block| block.pointer_mut("/image_url/url"))
                .map(|slot| replace(slot, DATA_URL_PLACEHOLDER, is_data_url))
                .filter(|&hit| hit)
                .count(),
            SensitiveField::MessageImageSource => content_blocks(payload)
                .filter(|block| block_type(block) == Some("image"))
                .filter_map(|block| block.pointer_mut("/source/data"))
                .map(|slot| replace(slot, BASE64_PLACEHOLDER, |_| true))
                .filter(|&hit| hit)
                .count(),
            SensitiveField::InlineData => gemini_parts(payload)
                .filter_map(|part| part.pointer_mut("/inline_data/data"))
                .map(|slot| replace(slot, BASE64_PLACEHOLDER, |_| true))
                .filter(|&hit| hit)
                .count(),
        }
    }
}

/// Locations that carry prompt text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    /// `messages[].content` when it is a plain string (OpenAI, Claude)
    ChatMessage,
    /// `contents[].parts[].text` (Gemini)
    GeminiPart,
}

impl PromptField {
    pub const ALL: [PromptField; 2] = [PromptField::ChatMessage, PromptField::GeminiPart];

    pub fn truncate(self, payload: &mut Value, budget: usize) -> usize {
        match self {
            PromptField::ChatMessage => elements(payload.get_mut("messages"))
                .filter_map(|message| message.get_mut("content"))
                .map(|slot| truncate_in_place(slot, budget))
                .filter(|&hit| hit)
                .count(),
            PromptField::GeminiPart => gemini_parts(payload)
                .filter_map(|part| part.get_mut("text"))
                .map(|slot| truncate_in_place(slot, budget))
                .filter(|&hit| hit)
                .count(),
        }
    }
}

/// Strips image data from the payload and any key from the endpoint
pub fn redact_trace(trace: &mut DebugTrace) -> usize {
    let mut replaced = 0;
    if let Some(payload) = trace.payload.as_mut() {
        for field in SensitiveField::ALL {
            replaced += field.redact(payload);
        }
    }
    if let Some(endpoint) = trace.endpoint.as_mut()
        && let Some(masked) = mask_query_key(endpoint)
    {
        *endpoint = masked;
        replaced += 1;
    }
    replaced
}

pub fn truncate_prompts(trace: &mut DebugTrace, budget: usize) -> usize {
    let Some(payload) = trace.payload.as_mut() else {
        return 0;
    };
    PromptField::ALL
        .into_iter()
        .map(|field| field.truncate(payload, budget))
        .sum()
}

/// Both passes, applied where the external call was issued
pub fn sanitize(mut trace: DebugTrace) -> DebugTrace {
    let redacted = redact_trace(&mut trace);
    let truncated = truncate_prompts(&mut trace, PROMPT_BUDGET);
    if redacted + truncated > 0 {
        tracing::debug!(
            "Sanitized {} trace: {} redacted, {} truncated",
            trace.provider,
            redacted,
            truncated
        );
    }
    trace
}

/// Final form of a trace for a log line or the review log. Redacts again
/// and caps the serialized size, marker included, at `LOG_BUDGET`.
pub fn render_for_log(trace: &DebugTrace) -> String {
    let mut trace = trace.clone();
    redact_trace(&mut trace);

    let rendered = serde_json::to_string_pretty(&trace)
        .unwrap_or_else(|e| format!("<unserializable trace for {}: {e}>", trace.provider));
    cap_chars(&rendered, LOG_BUDGET - TRUNCATION_MARKER.chars().count())
}

fn elements(value: Option<&mut Value>) -> impl Iterator<Item = &mut Value> {
    value.and_then(Value::as_array_mut).into_iter().flatten()
}

fn content_blocks(payload: &mut Value) -> impl Iterator<Item = &mut Value> {
    elements(payload.get_mut("messages"))
        .flat_map(|message| elements(message.get_mut("content")))
}

fn gemini_parts(payload: &mut Value) -> impl Iterator<Item = &mut Value> {
    elements(payload.get_mut("contents")).flat_map(|content| elements(content.get_mut("parts")))
}

fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

fn replace(slot: &mut Value, placeholder: &str, applies: impl Fn(&str) -> bool) -> bool {
    match slot {
        Value::String(s) if !s.is_empty() && s.as_str() != placeholder && applies(s.as_str()) => {
            *s = placeholder.to_string();
            true
        }
        _ => false,
    }
}

fn truncate_in_place(slot: &mut Value, budget: usize) -> bool {
    let Value::String(s) = slot else {
        return false;
    };
    if s.chars().count() <= budget || is_truncated(s, budget) {
        return false;
    }
    *s = cap_chars(s, budget);
    true
}

fn is_truncated(s: &str, budget: usize) -> bool {
    s.ends_with(TRUNCATION_MARKER)
        && s.chars().count() == budget + TRUNCATION_MARKER.chars().count()
}

fn cap_chars(s: &str, budget: usize) -> String {
    if s.chars().count() <= budget {
        return s.to_string();
    }
    let mut capped: String = s.chars().take(budget).collect();
    capped.push_str(TRUNCATION_MARKER);
    capped
}

fn mask_query_key(endpoint: &str) -> Option<String> {
    let (base, query) = endpoint.split_once('?')?;
    let mut changed = false;
    let params: Vec<String> = query
        .split('&')
        .map(|param| match param.split_once('=') {
            Some(("key", value)) if value != KEY_PLACEHOLDER => {
                changed = true;
                format!("key={KEY_PLACEHOLDER}")
            }
            _ => param.to_string(),
        })
        .collect();
    changed.then(|| format!("{base}?{}", params.join("&")))
}
