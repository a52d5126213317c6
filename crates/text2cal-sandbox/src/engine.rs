use async_trait::async_trait;
use text2cal_types::{NOT_INITIALIZED, SegmentationMode};

/// Engine build to instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCore {
    /// SIMD build, preferred
    Accelerated,
    /// Portable build, the one fallback
    Baseline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// Error text for a `Ready` announcement, `None` when ready
    pub fn error(&self) -> Option<String> {
        match self {
            Readiness::Ready => None,
            Readiness::Failed(reason) => Some(reason.clone()),
            Readiness::Uninitialized | Readiness::Initializing => {
                Some(NOT_INITIALIZED.to_string())
            }
        }
    }
}

/// Creates engine instances on a given core
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn spawn(&self, core: EngineCore) -> anyhow::Result<Box<dyn EngineInstance>>;
}

/// One engine, used for at most one recognition
#[async_trait]
pub trait EngineInstance: Send {
    async fn recognize(&mut self, png: &[u8], mode: SegmentationMode) -> anyhow::Result<String>;

    async fn terminate(self: Box<Self>) -> anyhow::Result<()>;
}
