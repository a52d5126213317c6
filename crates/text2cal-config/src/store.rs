use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// External key-value store holding [`Settings`].
///
/// Callers load once per operation and never keep the result, so an edit
/// made between two captures applies to the second one.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, SettingsError>;
}

/// In-process store, written by whatever plays the options page
#[derive(Default)]
pub struct MemorySettings {
    inner: RwLock<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub async fn replace(&self, settings: Settings) {
        *self.inner.write().await = settings;
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.inner.read().await.clone())
    }
}

/// Settings JSON on disk, re-read on every load. A missing file means defaults.
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettings {
    async fn load(&self) -> Result<Settings, SettingsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    "Settings file {} not found, using defaults",
                    self.path.display()
                );
                Ok(Settings::default())
            }
            Err(source) => Err(SettingsError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_sees_replacements() {
        let store = MemorySettings::default();
        assert_eq!(store.load().await.unwrap().parse_method, "local");

        store
            .replace(Settings {
                parse_method: "gemini".into(),
                ..Settings::default()
            })
            .await;
        assert_eq!(store.load().await.unwrap().parse_method, "gemini");
    }

    #[tokio::test]
    async fn test_file_store_rereads_every_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettings::new(&path);

        assert_eq!(store.load().await.unwrap(), Settings::default());

        std::fs::write(&path, r#"{"ocrMethod":"google-vision","apiKeys":{"google":"g"}}"#)
            .unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.ocr_method, "google-vision");
        assert_eq!(loaded.api_keys.google, "g");
        assert_eq!(loaded.parse_method, "local");

        std::fs::write(&path, r#"{"ocrMethod":"openai-vision"}"#).unwrap();
        assert_eq!(store.load().await.unwrap().ocr_method, "openai-vision");
    }

    #[tokio::test]
    async fn test_file_store_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileSettings::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
