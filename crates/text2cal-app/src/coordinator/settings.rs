use std::sync::Arc;

use text2cal_core::PipelineError;
use text2cal_types::Reply;

use super::Coordinator;

/// Selected methods only; credentials stay in the coordinator
pub async fn handle_get_settings(coordinator: Arc<Coordinator>) -> Result<Reply, PipelineError> {
    let settings = coordinator.load_settings().await?;

    Ok(Reply::Settings {
        ocr_method: settings.selected_ocr_method().to_string(),
        parse_method: settings.selected_parse_method().to_string(),
    })
}
