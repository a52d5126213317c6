use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tempfile::TempDir;
use text2cal_config::sandbox::SandboxConfig;
use text2cal_types::SegmentationMode;
use tokio::process::Command;

use crate::engine::{EngineCore, EngineInstance, EngineLoader};

/// Runs the `tesseract` CLI. An instance owns a scratch directory that is
/// removed when the instance terminates.
pub struct TesseractLoader {
    config: SandboxConfig,
}

impl TesseractLoader {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn binary(&self, core: EngineCore) -> &Path {
        match core {
            EngineCore::Accelerated => &self.config.accelerated_binary,
            EngineCore::Baseline => &self.config.baseline_binary,
        }
    }
}

#[async_trait]
impl EngineLoader for TesseractLoader {
    async fn spawn(&self, core: EngineCore) -> anyhow::Result<Box<dyn EngineInstance>> {
        let binary = self.binary(core).to_path_buf();

        let output = Command::new(&binary)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to start {}", binary.display()))?;
        if !output.status.success() {
            bail!(
                "{} --version exited with {}: {}",
                binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let scratch = tempfile::Builder::new()
            .prefix("text2cal-ocr-")
            .tempdir()
            .context("Failed to create OCR scratch directory")?;

        tracing::debug!("[SANDBOX] Spawned {:?} engine {}", core, binary.display());
        Ok(Box::new(TesseractInstance {
            binary,
            language: self.config.language.clone(),
            scratch,
        }))
    }
}

struct TesseractInstance {
    binary: PathBuf,
    language: String,
    scratch: TempDir,
}

#[async_trait]
impl EngineInstance for TesseractInstance {
    async fn recognize(&mut self, png: &[u8], mode: SegmentationMode) -> anyhow::Result<String> {
        let input = self.scratch.path().join("input.png");
        tokio::fs::write(&input, png)
            .await
            .context("Failed to write OCR input")?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("--psm")
            .arg(mode.psm().to_string())
            .arg("-l")
            .arg(&self.language)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn terminate(self: Box<Self>) -> anyhow::Result<()> {
        self.scratch
            .close()
            .context("Failed to remove OCR scratch directory")
    }
}
