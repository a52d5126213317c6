use std::env;
use std::path::PathBuf;

use self::sandbox::SandboxConfig;

pub mod sandbox;
pub mod settings;
pub mod store;

pub use settings::{ApiKeys, Settings};
pub use store::{JsonFileSettings, MemorySettings, SettingsError, SettingsStore};

/// Process-level configuration, read from the environment once at startup.
/// User-facing provider choices live in [`Settings`] instead.
pub struct Config {
    pub sandbox: SandboxConfig,
    /// Settings JSON file; `None` keeps settings in memory
    pub settings_path: Option<PathBuf>,
    /// Capacity of each cross-context channel
    pub channel_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        let settings_path = env::var("TEXT2CAL_SETTINGS").ok().map(PathBuf::from);

        let channel_capacity = env::var("TEXT2CAL_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(64);

        Config {
            sandbox: SandboxConfig::new(),
            settings_path,
            channel_capacity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
