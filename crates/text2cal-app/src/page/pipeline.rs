//! Coordinator calls made on behalf of the page. Each runs as its own task
//! and feeds the outcome back into the page loop as a [`PageInput`], so the
//! loop never blocks on a provider.

use kanal::AsyncSender;
use text2cal_capture::{CapturedImage, crop_frame, decode_data_url};
use text2cal_core::PipelineError;
use text2cal_types::{CaptureRect, CoordinatorRequest, OcrProviderId, ParserId, Reply, RequestId};

use super::PageInput;
use crate::coordinator::CoordinatorPort;

async fn deliver(inputs: &AsyncSender<PageInput>, input: PageInput) {
    if let Err(e) = inputs.send(input).await {
        tracing::debug!("[PAGE] Page loop gone, dropping result: {}", e);
    }
}

/// `Failure` envelopes become errors so callers only match on success.
/// Provider calls skip this and keep the envelope for its trace.
fn expect_reply(reply: Result<Reply, PipelineError>) -> Result<Reply, PipelineError> {
    match reply? {
        Reply::Failure { error, .. } => Err(PipelineError::Remote(error)),
        reply => Ok(reply),
    }
}

pub async fn capture_region(
    coordinator: CoordinatorPort,
    rect: CaptureRect,
    inputs: AsyncSender<PageInput>,
) {
    let result = screenshot_and_crop(&coordinator, rect).await;
    deliver(&inputs, PageInput::Cropped(result)).await;
}

async fn screenshot_and_crop(
    coordinator: &CoordinatorPort,
    rect: CaptureRect,
) -> Result<CapturedImage, PipelineError> {
    let reply = expect_reply(coordinator.request(CoordinatorRequest::Screenshot).await)?;
    let Reply::Screenshot { data_url } = reply else {
        return Err(PipelineError::Protocol(format!(
            "Expected a screenshot, got {}",
            reply.kind()
        )));
    };

    tokio::task::spawn_blocking(move || {
        let frame = decode_data_url(&data_url)?;
        crop_frame(&frame, &rect)
    })
    .await
    .map_err(|e| PipelineError::Capture(e.to_string()))?
    .map_err(|e| PipelineError::Capture(e.to_string()))
}

pub async fn load_settings(coordinator: CoordinatorPort, inputs: AsyncSender<PageInput>) {
    let reply = expect_reply(coordinator.request(CoordinatorRequest::GetSettings).await);
    deliver(&inputs, PageInput::SettingsLoaded(reply)).await;
}

pub async fn run_ocr(
    coordinator: CoordinatorPort,
    provider: OcrProviderId,
    image: String,
    request_id: RequestId,
    inputs: AsyncSender<PageInput>,
) {
    let reply = coordinator
        .request(CoordinatorRequest::RunOcr {
            provider,
            image,
            request_id,
        })
        .await;
    deliver(
        &inputs,
        PageInput::OcrFinished { request_id, reply },
    )
    .await;
}

pub async fn run_parse(
    coordinator: CoordinatorPort,
    provider: ParserId,
    text: String,
    request_id: RequestId,
    inputs: AsyncSender<PageInput>,
) {
    let reply = coordinator
        .request(CoordinatorRequest::RunParse {
            provider,
            text,
            request_id,
        })
        .await;
    deliver(
        &inputs,
        PageInput::ParseFinished { request_id, reply },
    )
    .await;
}

/// Fire-and-forget; the coordinator answers with an ack and later sends
/// `BeginCapture` back to this page
pub async fn request_redraw(coordinator: CoordinatorPort) {
    match coordinator.request(CoordinatorRequest::Redraw).await {
        Ok(reply) if reply.is_ok() => {}
        Ok(reply) => tracing::warn!("[PAGE] Redraw refused: {:?}", reply),
        Err(e) => tracing::warn!("[PAGE] Redraw not delivered: {}", e),
    }
}
