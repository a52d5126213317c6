use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, ImageRef, OcrProviderId};

use super::EXTRACT_INSTRUCTION;
use crate::endpoints::gemini::{MODEL, endpoint};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{OcrProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "Gemini";

pub struct GeminiVisionOcr {
    transport: Arc<dyn HttpTransport>,
}

impl GeminiVisionOcr {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn build_payload(mime: &str, base64: &str) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACT_INSTRUCTION },
                    { "inline_data": { "mime_type": mime, "data": base64 } },
                ],
            }],
        })
    }

    /// Joins every text part of the first candidate
    fn extract_text(body: &Value) -> String {
        body.pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl OcrProvider for GeminiVisionOcr {
    fn id(&self) -> OcrProviderId {
        OcrProviderId::GeminiVision
    }

    async fn run(
        &self,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        let key = require_key(&keys.gemini, "Gemini API key is missing.")?;
        let ImageRef::Inline { mime, base64 } = image else {
            return Err(ProviderError::InvalidInput(
                "Gemini vision needs an inline base64 image".to_string(),
            ));
        };
        let payload = Self::build_payload(mime, base64);
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

        Ok(ProviderOutput {
            result: Self::extract_text(&response.body),
            trace,
        })
    }
}
