use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

/// Host service that captures the visible frame
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    /// Encoded full-frame image
    async fn capture_visible(&self) -> anyhow::Result<Vec<u8>>;
}

/// Serves a screenshot saved on disk, read again on every capture
pub struct FileScreenshot {
    path: PathBuf,
}

impl FileScreenshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScreenshotSource for FileScreenshot {
    async fn capture_visible(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read screenshot {}", self.path.display()))
    }
}
