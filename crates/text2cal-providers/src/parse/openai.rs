use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, EventDetails, ParserId};

use super::{build_prompt, decode_event};
use crate::endpoints::openai::{ENDPOINT, MODEL};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{ParseInput, ParseProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "OpenAI";

/// Chat completion in native JSON mode
pub struct OpenAiParser {
    transport: Arc<dyn HttpTransport>,
}

impl OpenAiParser {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ParseProvider for OpenAiParser {
    fn id(&self) -> ParserId {
        ParserId::OpenAi
    }

    async fn run(
        &self,
        input: &ParseInput,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError> {
        let key = require_key(&keys.openai, "OpenAI key missing.")?;
        let payload = json!({
            "model": MODEL,
            "messages": [{ "role": "user", "content": build_prompt(&input.text, input.now) }],
            "response_format": { "type": "json_object" },
        });

        let trace = DebugTrace::request(self.id().as_str(), Some(MODEL), ENDPOINT, payload.clone());
        let traced = |e: ProviderError| e.with_trace(trace.clone());

        let response = self
            .transport
            .post_json(HttpRequest {
                provider: PROVIDER,
                url: ENDPOINT.to_string(),
                headers: vec![("Authorization", format!("Bearer {key}"))],
                body: payload,
            })
            .await
            .map_err(traced)?;
        response
            .ensure_success(PROVIDER, "/error/message")
            .map_err(traced)?;

        let raw = response
            .body
            .pointer("/choices/0/message/content")
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

    fn keys() -> ApiKeys {
        ApiKeys {
            openai: "sk".into(),
            ..ApiKeys::default()
        }
    }

    #[tokio::test]
    async fn test_json_mode_answer_is_decoded() {
        let answer = r#"{"title":"Dentist","start":"2025-09-24T14:30:00","end":null,"location":"Room 4","hasTime":true}"#;
        let transport = Arc::new(RecordingTransport::new().respond(
            200,
            json!({"choices": [{"message": {"content": answer}}]}),
        ));
        let parser = OpenAiParser::new(transport.clone());

        let output = parser.run(&ParseInput::new("Dentist"), &keys()).await.unwrap();

        assert_eq!(output.result.title.as_deref(), Some("Dentist"));
        assert_eq!(output.result.location.as_deref(), Some("Room 4"));
        assert!(!output.result.is_all_day());
        let body = &transport.requests()[0].body;
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body["messages"][0]["content"].as_str().unwrap().contains("Dentist"));
    }

    #[tokio::test]
    async fn test_missing_content_yields_empty_event() {
        let transport = Arc::new(RecordingTransport::new().respond(200, json!({"choices": []})));
        let parser = OpenAiParser::new(transport);

        let output = parser.run(&ParseInput::new("x"), &keys()).await.unwrap();
        assert_eq!(output.result, EventDetails::default());
    }
}
