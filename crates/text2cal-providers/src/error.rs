use text2cal_types::{DebugTrace, UnknownProvider};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing credential; raised before any request is sent
    #[error("{0}")]
    Configuration(String),

    #[error("{provider} API error: {message}")]
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    Protocol { provider: String, message: String },

    #[error("Valid JSON not found in {provider} response (expected <{tag}> block)")]
    MissingDelimiter { provider: String, tag: &'static str },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotReady(String),

    #[error("{0}")]
    Worker(String),

    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),

    /// Failure after the request went out, with that request attached
    #[error("{error}")]
    Traced {
        error: Box<ProviderError>,
        trace: Box<DebugTrace>,
    },
}

impl ProviderError {
    pub fn protocol(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Protocol {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn with_trace(self, trace: DebugTrace) -> Self {
        match self {
            ProviderError::Traced { .. } => self,
            error => ProviderError::Traced {
                error: Box::new(error),
                trace: Box::new(trace),
            },
        }
    }

    /// Outbound request of a failed call, unredacted
    pub fn trace(&self) -> Option<&DebugTrace> {
        match self {
            ProviderError::Traced { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// The failure itself, without any attached trace
    pub fn cause(&self) -> &ProviderError {
        match self {
            ProviderError::Traced { error, .. } => error.cause(),
            error => error,
        }
    }
}

/// Fails fast when a cloud credential is blank
pub(crate) fn require_key<'a>(key: &'a str, missing: &str) -> Result<&'a str, ProviderError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ProviderError::Configuration(missing.to_string()));
    }
    Ok(key)
}
