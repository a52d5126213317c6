use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, ImageRef, OcrProviderId};

use crate::endpoints::claude::{self, ENDPOINT, MODEL};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{OcrProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "Claude";

pub struct ClaudeVisionOcr {
    transport: Arc<dyn HttpTransport>,
}

impl ClaudeVisionOcr {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn build_payload(mime: &str, base64: &str) -> Value {
        json!({
            "model": MODEL,
            "max_tokens": 2000,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": { "type": "base64", "media_type": mime, "data": base64 },
                    },
                    { "type": "text", "text": "Extract text from this image." },
                ],
            }],
        })
    }
}

#[async_trait]
impl OcrProvider for ClaudeVisionOcr {
    fn id(&self) -> OcrProviderId {
        OcrProviderId::ClaudeVision
    }

    async fn run(
        &self,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        let key = require_key(&keys.claude, "Claude API key is missing.")?;
        let ImageRef::Inline { mime, base64 } = image else {
            return Err(ProviderError::InvalidInput(
                "Claude vision needs an inline base64 image".to_string(),
            ));
        };
        let payload = Self::build_payload(mime, base64);

        let trace = DebugTrace::request(self.id().as_str(), Some(MODEL), ENDPOINT, payload.clone());
        let traced = |e: ProviderError| e.with_trace(trace.clone());

        let response = self
            .transport
            .post_json(HttpRequest {
                provider: PROVIDER,
                url: ENDPOINT.to_string(),
                headers: claude::headers(key),
                body: payload,
            })
            .await
            .map_err(traced)?;
        response
            .ensure_success(PROVIDER, "/error/message")
            .map_err(traced)?;

        let text = response
            .body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(ProviderOutput {
            result: text,
            trace,
        })
    }
}
