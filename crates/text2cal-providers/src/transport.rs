use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;

/// One JSON POST to a provider endpoint
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Provider name used in error messages
    pub provider: &'static str,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// `Null` when a failed response carried no JSON
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Provider-reported error at `pointer`, else a generic HTTP status
    /// message for non-success responses.
    pub fn error_message(&self, pointer: &str) -> Option<String> {
        if let Some(message) = self.body.pointer(pointer).and_then(Value::as_str) {
            return Some(message.to_string());
        }
        (!self.is_success()).then(|| format!("HTTP {}", self.status))
    }

    pub fn ensure_success(&self, provider: &str, pointer: &str) -> Result<(), ProviderError> {
        match self.error_message(pointer) {
            Some(message) => Err(ProviderError::Transport {
                provider: provider.to_string(),
                status: Some(self.status),
                message,
            }),
            None => Ok(()),
        }
    }
}

/// Seam between adapters and the network
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let transport_error = |e: reqwest::Error| ProviderError::Transport {
            provider: request.provider.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        };

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        tracing::debug!("{} responded {} ({} bytes)", request.provider, status, text.len());

        let body = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if (200..300).contains(&status) => {
                return Err(ProviderError::protocol(
                    request.provider,
                    format!("response is not JSON: {e}"),
                ));
            }
            Err(_) => Value::Null,
        };

        Ok(HttpResponse { status, body })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses and records every request it receives
    #[derive(Default)]
    pub struct RecordingTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: Value) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(HttpResponse { status, body });
            self
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
            let provider = request.provider;
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Transport {
                    provider: provider.to_string(),
                    status: None,
                    message: "no canned response".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_message_prefers_provider_text() {
        let response = HttpResponse {
            status: 400,
            body: json!({"error": {"message": "bad key"}}),
        };
        assert_eq!(response.error_message("/error/message").as_deref(), Some("bad key"));

        let response = HttpResponse {
            status: 502,
            body: Value::Null,
        };
        assert_eq!(response.error_message("/error/message").as_deref(), Some("HTTP 502"));
    }

    #[test]
    fn test_error_field_on_success_status_still_fails() {
        let response = HttpResponse {
            status: 200,
            body: json!({"responses": [{"error": {"message": "quota"}}]}),
        };
        let err = response
            .ensure_success("Google Vision", "/responses/0/error/message")
            .unwrap_err();
        assert_eq!(err.to_string(), "Google Vision API error: quota");
    }
}
