use std::collections::HashMap;
use std::sync::Arc;

use text2cal_config::ApiKeys;
use text2cal_types::{EventDetails, ImageRef, OcrProviderId, ParserId, UnknownProvider};

use crate::ocr::{ClaudeVisionOcr, GeminiVisionOcr, GoogleVisionOcr, OpenAiVisionOcr};
use crate::parse::{ClaudeParser, GeminiParser, LocalParser, OpenAiParser};
use crate::transport::HttpTransport;
use crate::{OcrProvider, ParseInput, ParseProvider, ProviderError, ProviderOutput};

/// OCR adapters keyed by provider id
#[derive(Default, Clone)]
pub struct OcrRegistry {
    adapters: HashMap<OcrProviderId, Arc<dyn OcrProvider>>,
}

impl OcrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cloud adapter. The local engine lives in the sandbox and is
    /// registered by whoever owns the bridge to it.
    pub fn with_cloud_adapters(transport: Arc<dyn HttpTransport>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GoogleVisionOcr::new(transport.clone())));
        registry.register(Arc::new(OpenAiVisionOcr::new(transport.clone())));
        registry.register(Arc::new(ClaudeVisionOcr::new(transport.clone())));
        registry.register(Arc::new(GeminiVisionOcr::new(transport)));
        registry
    }

    /// Replaces any adapter already registered under the same id
    pub fn register(&mut self, adapter: Arc<dyn OcrProvider>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: OcrProviderId) -> Result<Arc<dyn OcrProvider>, ProviderError> {
        self.adapters.get(&id).cloned().ok_or_else(|| {
            UnknownProvider {
                family: "OCR",
                id: id.to_string(),
            }
            .into()
        })
    }

    pub async fn run(
        &self,
        id: OcrProviderId,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        let adapter = self.get(id)?;
        tracing::debug!("[OCR] Running {}", id);
        adapter.run(image, keys).await
    }
}

/// Parse adapters keyed by provider id
#[derive(Default, Clone)]
pub struct ParseRegistry {
    adapters: HashMap<ParserId, Arc<dyn ParseProvider>>,
}

impl ParseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloud parsers plus the network-free local one
    pub fn with_default_adapters(transport: Arc<dyn HttpTransport>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalParser));
        registry.register(Arc::new(OpenAiParser::new(transport.clone())));
        registry.register(Arc::new(GeminiParser::new(transport.clone())));
        registry.register(Arc::new(ClaudeParser::new(transport)));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ParseProvider>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: ParserId) -> Result<Arc<dyn ParseProvider>, ProviderError> {
        self.adapters.get(&id).cloned().ok_or_else(|| {
            UnknownProvider {
                family: "parse",
                id: id.to_string(),
            }
            .into()
        })
    }

    pub async fn run(
        &self,
        id: ParserId,
        input: &ParseInput,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError> {
        let adapter = self.get(id)?;
        tracing::debug!("[PARSE] Running {} on {} chars", id, input.text.len());
        adapter.run(input, keys).await
    }
}
