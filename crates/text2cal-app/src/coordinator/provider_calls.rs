use std::sync::Arc;

use text2cal_core::{PipelineError, redact};
use text2cal_providers::{ParseInput, ProviderError};
use text2cal_types::{ImageRef, OcrProviderId, ParserId, Reply, RequestId};

use super::Coordinator;

/// Settings → registry → sanitize, echoing `request_id` unchanged
pub async fn handle_ocr(
    coordinator: Arc<Coordinator>,
    provider: OcrProviderId,
    image: String,
    request_id: Option<RequestId>,
) -> Result<Reply, PipelineError> {
    let settings = coordinator.load_settings().await?;
    let image = ImageRef::parse(&image);

    let output = match coordinator
        .ocr
        .run(provider, &image, &settings.api_keys)
        .await
    {
        Ok(output) => output,
        Err(e) => return Ok(failed_call("OCR", e)),
    };

    tracing::info!(
        "[COORDINATOR] OCR via {} extracted {} chars",
        provider,
        output.result.len()
    );
    Ok(Reply::OcrText {
        text: output.result,
        debug: redact::sanitize(output.trace),
        request_id,
    })
}

pub async fn handle_parse(
    coordinator: Arc<Coordinator>,
    provider: ParserId,
    text: String,
    request_id: Option<RequestId>,
) -> Result<Reply, PipelineError> {
    let settings = coordinator.load_settings().await?;

    let output = match coordinator
        .parsers
        .run(provider, &ParseInput::new(text), &settings.api_keys)
        .await
    {
        Ok(output) => output,
        Err(e) => return Ok(failed_call("Parse", e)),
    };

    tracing::info!(
        "[COORDINATOR] Parse via {} (hasTime: {:?})",
        provider,
        output.result.has_time
    );
    Ok(Reply::Parsed {
        result: output.result,
        debug: redact::sanitize(output.trace),
        request_id,
    })
}

/// Failure envelope that still carries the sanitized request, if one was sent
fn failed_call(stage: &str, err: ProviderError) -> Reply {
    let debug = err.trace().cloned().map(redact::sanitize);
    let err = PipelineError::from(err);
    tracing::warn!("[COORDINATOR] {} failed: {}", stage, err);
    Reply::Failure {
        error: err.to_string(),
        debug,
    }
}
