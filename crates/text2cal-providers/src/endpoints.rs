//! Endpoints and models shared by the OCR and parse adapters

pub(crate) mod openai {
    pub(crate) const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub(crate) const MODEL: &str = "gpt-4o-mini";
}

pub(crate) mod claude {
    pub(crate) const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
    pub(crate) const MODEL: &str = "claude-3-haiku-20240307";
    const API_VERSION: &str = "2023-06-01";

    pub(crate) fn headers(key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("x-api-key", key.to_string()),
            ("anthropic-version", API_VERSION.to_string()),
        ]
    }
}

pub(crate) mod gemini {
    pub(crate) const MODEL: &str = "gemini-1.5-flash-latest";

    /// `generateContent` endpoint without the key query parameter
    pub(crate) fn endpoint() -> String {
        format!("https://generativelanguage.googleapis.com/v1beta/models/{MODEL}:generateContent")
    }
}
