use std::sync::Arc;

use text2cal_capture::png_data_url;
use text2cal_core::PipelineError;
use text2cal_types::{PageMessage, Reply};

use super::{Coordinator, PagePort};

/// Pings the page and, if it answers, tells it to show the overlay
pub async fn start_capture(page: PagePort) {
    match page.request(PageMessage::Ping).await {
        Ok(reply) if reply.is_ok() => {
            tracing::debug!("[COORDINATOR] Page context already live");
        }
        Ok(reply) => {
            tracing::warn!("[COORDINATOR] Page refused ping ({}), capture skipped", reply.kind());
            return;
        }
        Err(e) => {
            tracing::warn!("[COORDINATOR] Page context not reachable, capture skipped: {}", e);
            return;
        }
    }

    if let Err(e) = page.request(PageMessage::BeginCapture).await {
        tracing::error!("[COORDINATOR] Failed to send beginCapture: {}", e);
    }
}

pub async fn handle_screenshot(coordinator: Arc<Coordinator>) -> Result<Reply, PipelineError> {
    let frame = coordinator
        .screenshots
        .capture_visible()
        .await
        .map_err(|e| PipelineError::Capture(format!("{e:#}")))?;

    tracing::debug!("[COORDINATOR] Captured visible frame ({} bytes)", frame.len());
    Ok(Reply::Screenshot {
        data_url: png_data_url(&frame),
    })
}
