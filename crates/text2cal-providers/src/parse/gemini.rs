use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, EventDetails, ParserId};

use super::{build_prompt, decode_event};
use crate::endpoints::gemini::{MODEL, endpoint};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{ParseInput, ParseProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "Gemini";

/// `generateContent` with a JSON response mime type
pub struct GeminiParser {
    transport: Arc<dyn HttpTransport>,
}

impl GeminiParser {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ParseProvider for GeminiParser {
    fn id(&self) -> ParserId {
        ParserId::Gemini
    }

    async fn run(
        &self,
        input: &ParseInput,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError> {
        let key = require_key(&keys.gemini, "Gemini key missing.")?;
        let payload = json!({
            "contents": [{ "parts": [{ "text": build_prompt(&input.text, input.now) }] }],
            "generationConfig": { "response_mime_type": "application/json" },
        });
        let endpoint = endpoint();

        let trace =
            DebugTrace::request(self.id().as_str(), Some(MODEL), &endpoint, payload.clone());
        let traced = |e: ProviderError| e.with_trace(trace.clone());

        let response = self
            .transport
            .post_json(HttpRequest {
                provider: PROVIDER,
                url: format!("{endpoint}?key={key}"),
                headers: vec![],
                body: payload,
            })
            .await
            .map_err(traced)?;
        response
            .ensure_success(PROVIDER, "/error/message")
            .map_err(traced)?;

        let raw = response
            .body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or("{}");

        Ok(ProviderOutput {
            result: decode_event(PROVIDER, raw).map_err(traced)?,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::testing::RecordingTransport;

    use super::*;

    #[tokio::test]
    async fn test_candidate_text_is_decoded() {
        let transport = Arc::new(RecordingTransport::new().respond(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": "{\"title\":\"Offsite\",\"hasTime\":false}"}]}}]}),
        ));
        let parser = GeminiParser::new(transport.clone());
        let keys = ApiKeys {
            gemini: "gm".into(),
            ..ApiKeys::default()
        };

        let output = parser.run(&ParseInput::new("Offsite Oct 3"), &keys).await.unwrap();

        assert_eq!(output.result.title.as_deref(), Some("Offsite"));
        assert!(output.result.is_all_day());
        assert_eq!(
            transport.requests()[0].body["generationConfig"]["response_mime_type"],
            "application/json"
        );
    }
}
