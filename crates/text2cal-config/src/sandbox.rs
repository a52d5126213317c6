use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "eng".to_string()
}

/// Local OCR engine binaries. The accelerated build is tried first and the
/// baseline build is the single fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub accelerated_binary: PathBuf,
    pub baseline_binary: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
}

impl SandboxConfig {
    pub fn new() -> Self {
        let baseline_binary = env::var("TEXT2CAL_TESSERACT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tesseract"));

        let accelerated_binary = env::var("TEXT2CAL_TESSERACT_SIMD")
            .map(PathBuf::from)
            .unwrap_or_else(|_| baseline_binary.clone());

        let language = env::var("TEXT2CAL_OCR_LANG").unwrap_or_else(|_| default_language());

        Self {
            accelerated_binary,
            baseline_binary,
            language,
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}
