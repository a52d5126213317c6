use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, ImageRef, OcrProviderId};

use super::EXTRACT_INSTRUCTION;
use crate::endpoints::openai::{ENDPOINT, MODEL};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{OcrProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "OpenAI";

pub struct OpenAiVisionOcr {
    transport: Arc<dyn HttpTransport>,
}

impl OpenAiVisionOcr {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn build_payload(image: &ImageRef) -> Value {
        json!({
            "model": MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACT_INSTRUCTION },
                    { "type": "image_url", "image_url": { "url": image.to_string() } },
                ],
            }],
            "max_tokens": 2000,
        })
    }
}

#[async_trait]
impl OcrProvider for OpenAiVisionOcr {
    fn id(&self) -> OcrProviderId {
        OcrProviderId::OpenAiVision
    }

    async fn run(
        &self,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        let key = require_key(&keys.openai, "OpenAI API key is missing.")?;
        let payload = Self::build_payload(image);

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

        let text = response
            .body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(ProviderOutput {
            result: text,
            trace,
        })
    }
}
