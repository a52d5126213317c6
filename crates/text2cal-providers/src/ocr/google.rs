use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, ImageRef, OcrProviderId};

use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{OcrProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "Google Vision";
const ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Cloud Vision `DOCUMENT_TEXT_DETECTION`
pub struct GoogleVisionOcr {
    transport: Arc<dyn HttpTransport>,
}

impl GoogleVisionOcr {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn build_payload(image: &ImageRef) -> Value {
        let image = match image {
            ImageRef::Inline { base64, .. } => json!({ "content": base64 }),
            ImageRef::Remote(url) => json!({ "source": { "imageUri": url } }),
        };

        json!({
            "requests": [{
                "image": image,
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION", "maxResults": 1 }],
                "imageContext": { "languageHints": ["en"] },
            }]
        })
    }

    /// Full-text annotation first, then the first (whole-image) text annotation
    fn extract_text(body: &Value) -> String {
        body.pointer("/responses/0/fullTextAnnotation/text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                body.pointer("/responses/0/textAnnotations/0/description")
                    .and_then(Value::as_str)
            })
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl OcrProvider for GoogleVisionOcr {
    fn id(&self) -> OcrProviderId {
        OcrProviderId::GoogleVision
    }

    async fn run(
        &self,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        let key = require_key(&keys.google, "Google Cloud API key is missing.")?;
        let payload = Self::build_payload(image);

        let trace = DebugTrace::request(self.id().as_str(), None, ENDPOINT, payload.clone());
        let traced = |e: ProviderError| e.with_trace(trace.clone());

        let response = self
            .transport
            .post_json(HttpRequest {
                provider: PROVIDER,
                url: format!("{ENDPOINT}?key={key}"),
                headers: vec![],
                body: payload,
            })
            .await
            .map_err(traced)?;
        response
            .ensure_success(PROVIDER, "/responses/0/error/message")
            .map_err(traced)?;

        Ok(ProviderOutput {
            result: Self::extract_text(&response.body),
            trace,
        })
    }
}
