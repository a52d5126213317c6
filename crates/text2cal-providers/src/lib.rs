//! OCR and event-parsing backends behind two uniform entry points.
//!
//! Each family has one trait; a registry maps the provider enum to an
//! adapter, so adding a backend is a registration rather than a new branch.
//! Every call returns the extracted result together with a [`DebugTrace`]
//! holding the exact outbound request. Traces are unredacted here; the
//! caller must sanitize them before they cross a logging boundary.

mod endpoints;
mod error;
pub mod ocr;
pub mod parse;
mod registry;
pub mod transport;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, EventDetails, ImageRef, OcrProviderId, ParserId};

pub use error::ProviderError;
pub use registry::{OcrRegistry, ParseRegistry};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Result plus the request that produced it
#[derive(Debug, Clone)]
pub struct ProviderOutput<T> {
    pub result: T,
    pub trace: DebugTrace,
}

/// Text extraction from an image
#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn id(&self) -> OcrProviderId;

    async fn run(
        &self,
        image: &ImageRef,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError>;
}

/// Input for an event parser. `now` anchors relative phrases like "tomorrow".
#[derive(Debug, Clone)]
pub struct ParseInput {
    pub text: String,
    pub now: DateTime<Local>,
}

impl ParseInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            now: Local::now(),
        }
    }

    pub fn at(text: impl Into<String>, now: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            now,
        }
    }
}

/// Event extraction from recognised text
#[async_trait]
pub trait ParseProvider: Send + Sync {
    fn id(&self) -> ParserId;

    async fn run(
        &self,
        input: &ParseInput,
        keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError>;
}
