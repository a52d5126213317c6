//! Always-running background context.
//!
//! Receives requests from the page and the CLI, calls providers, and
//! answers every request with exactly one [`Reply`]. Handler errors are
//! turned into `Reply::Failure` here and never cross the boundary as-is.

use std::future::Future;
use std::sync::Arc;

use text2cal_capture::ScreenshotSource;
use text2cal_config::{Settings, SettingsStore};
use text2cal_core::{Dispatch, Envelope, Mailbox, PipelineError, Port, Responder};
use text2cal_providers::{OcrRegistry, ParseRegistry};
use text2cal_types::{CoordinatorRequest, PageMessage, Reply};
use tokio_util::sync::CancellationToken;

pub mod capture;
pub mod provider_calls;
pub mod settings;

use capture::{handle_screenshot, start_capture};
use provider_calls::{handle_ocr, handle_parse};
use settings::handle_get_settings;

pub type CoordinatorPort = Port<CoordinatorRequest, Reply>;
pub type PagePort = Port<PageMessage, Reply>;

pub struct Coordinator {
    pub settings: Arc<dyn SettingsStore>,
    pub ocr: OcrRegistry,
    pub parsers: ParseRegistry,
    pub screenshots: Arc<dyn ScreenshotSource>,
    pub page: PagePort,
}

impl Coordinator {
    /// Fresh snapshot for one operation
    pub async fn load_settings(&self) -> Result<Settings, PipelineError> {
        self.settings
            .load()
            .await
            .map_err(|e| PipelineError::Configuration(e.to_string()))
    }

    pub fn dispatch(self: &Arc<Self>, envelope: Envelope<CoordinatorRequest, Reply>) -> Dispatch {
        let Envelope {
            message,
            responder,
        } = envelope;

        match message {
            CoordinatorRequest::Ping => {
                responder.respond(Reply::Ack);
                Dispatch::Replied
            }
            CoordinatorRequest::BeginCapture | CoordinatorRequest::Redraw => {
                responder.respond(Reply::Ack);
                tokio::spawn(start_capture(self.page.clone()));
                Dispatch::Replied
            }
            CoordinatorRequest::Screenshot => {
                pending(responder, "screenshot", handle_screenshot(self.clone()))
            }
            CoordinatorRequest::GetSettings => {
                pending(responder, "getSettings", handle_get_settings(self.clone()))
            }
            CoordinatorRequest::RunOcr {
                provider,
                image,
                request_id,
            } => pending(
                responder,
                "runOcr",
                handle_ocr(self.clone(), provider, image, Some(request_id)),
            ),
            CoordinatorRequest::RunParse {
                provider,
                text,
                request_id,
            } => pending(
                responder,
                "runParse",
                handle_parse(self.clone(), provider, text, Some(request_id)),
            ),
            CoordinatorRequest::DiagTestOcr { provider, image } => pending(
                responder,
                "diagTestOcr",
                handle_ocr(self.clone(), provider, image, None),
            ),
            CoordinatorRequest::DiagTestParse { provider, text } => pending(
                responder,
                "diagTestParse",
                handle_parse(self.clone(), provider, text, None),
            ),
            CoordinatorRequest::Unknown => {
                tracing::debug!("[COORDINATOR] Unhandled message");
                Dispatch::Unhandled
            }
        }
    }
}

/// Keeps the responder alive until `handler` settles
fn pending<F>(responder: Responder<Reply>, kind: &'static str, handler: F) -> Dispatch
where
    F: Future<Output = Result<Reply, PipelineError>> + Send + 'static,
{
    tokio::spawn(async move {
        let reply = match handler.await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("[COORDINATOR] {} failed: {}", kind, e);
                Reply::failure(e)
            }
        };
        responder.respond(reply);
    });
    Dispatch::Pending
}

/// Coordinator main loop
pub async fn coordinator_loop(
    coordinator: Arc<Coordinator>,
    mailbox: Mailbox<CoordinatorRequest, Reply>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[COORDINATOR] Starting main loop, waiting for requests");
    loop {
        let envelope = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("[COORDINATOR] Shutting down");
                return Ok(());
            }
            envelope = mailbox.recv() => match envelope {
                Some(envelope) => envelope,
                None => {
                    tracing::debug!("[COORDINATOR] Every port closed");
                    return Ok(());
                }
            },
        };

        let kind = envelope.message.kind();
        let dispatch = coordinator.dispatch(envelope);
        tracing::debug!("[COORDINATOR] {} -> {:?}", kind, dispatch);
    }
}
