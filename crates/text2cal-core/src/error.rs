use text2cal_providers::ProviderError;
use text2cal_types::RequestId;

use crate::correlation::Slot;

/// Failures of the capture → OCR → parse pipeline as seen by a context
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing credential for the selected provider
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Protocol(String),

    /// Reply token differs from the last one issued for its slot
    #[error("Stale {slot} response")]
    StaleResponse { slot: Slot, received: RequestId },

    #[error("{0}")]
    NotReady(String),

    #[error("{0}")]
    UnknownProvider(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    /// Failure envelope returned by another context
    #[error("{0}")]
    Remote(String),

    /// The other context dropped the request without answering
    #[error("Message not handled: {0}")]
    NotHandled(&'static str),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::Configuration(_) | ProviderError::InvalidInput(_) => {
                PipelineError::Configuration(message)
            }
            ProviderError::Transport { .. } | ProviderError::Worker(_) => {
                PipelineError::Transport(message)
            }
            ProviderError::Protocol { .. } | ProviderError::MissingDelimiter { .. } => {
                PipelineError::Protocol(message)
            }
            ProviderError::NotReady(_) => PipelineError::NotReady(message),
            ProviderError::UnknownProvider(_) => PipelineError::UnknownProvider(message),
            ProviderError::Traced { error, .. } => PipelineError::from(*error),
        }
    }
}
