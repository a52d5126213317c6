use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, EventDetails, ParserId};

use super::{build_prompt, decode_event};
use crate::endpoints::claude::{self, ENDPOINT, MODEL};
use crate::error::require_key;
use crate::transport::{HttpRequest, HttpTransport};
use crate::{ParseInput, ParseProvider, ProviderError, ProviderOutput};

const PROVIDER: &str = "Claude";
const TAG: &str = "json";

/// Messages API has no JSON mode, so the answer is requested inside a
/// `<json>` block and anything without that block is rejected.
pub struct ClaudeParser {
    transport: Arc<dyn HttpTransport>,
}

impl ClaudeParser {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

/// Content of the first `<tag>...</tag>` block
fn tagged_block<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(&text[start..start + len])
}

#[async_trait]
impl ParseProvider for ClaudeParser {
    fn id(&self) -> ParserId {
        ParserId::Claude
    }

    async fn run(
        &self,
        input: &ParseInput,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError> {
        let key = require_key(&keys.claude, "Claude key missing.")?;
        let prompt = format!(
            "{}\n\nReturn JSON inside <{TAG}> tags.",
            build_prompt(&input.text, input.now)
        );
        let payload = json!({
            "model": MODEL,
            "max_tokens": 1024,
            "messages": [{ "role": "user", "content": prompt }],
        });

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

        let answer = response
            .body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let raw = tagged_block(answer, TAG)
            .ok_or(ProviderError::MissingDelimiter {
                provider: PROVIDER.to_string(),
                tag: TAG,
            })
            .map_err(traced)?;

        Ok(ProviderOutput {
            result: decode_event(PROVIDER, raw).map_err(traced)?,
            trace,
        })
    }
}
