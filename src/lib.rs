//! ytdlp-desk - Core Library
//!
//! Backend for a desktop front-end to `yt-dlp`: the download process
//! supervisor, configuration, download history and the command functions the
//! UI calls.

pub mod commands;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    config::{AppConfig, DownloadDefaults, YtDlpConfig},
    history::{DownloadHistory, HistoryEntry, HistoryStatistics, HistoryStatus},
    models::{
        AppError, AppResult, DownloadEvent, DownloadOptions, DownloadState, DownloadUpdate,
    },
    progress_parser::{classify_line, parse_percent},
    ytdlp::{DownloadHandle, YtDlp},
};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Application state shared between command functions
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<tokio::sync::RwLock<AppConfig>>,
    pub history: DownloadHistory,
    /// Handles of downloads that have not reached a terminal event yet
    pub active_downloads: Arc<Mutex<HashMap<String, DownloadHandle>>>,
    updates: broadcast::Sender<DownloadUpdate>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(tokio::sync::RwLock::new(config)),
            history: DownloadHistory::new(),
            active_downloads: Arc::new(Mutex::new(HashMap::new())),
            updates,
        }
    }

    /// Build state from the persisted configuration plus environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_or_initialize_config();
        config.apply_env_overrides();
        Self::new(config)
    }

    /// Receive every event of every download started through this state
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn publish(&self, update: DownloadUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    fn load_or_initialize_config() -> AppConfig {
        match AppConfig::load() {
            Ok(cfg) => {
                if let Err(err) = cfg.validate() {
                    tracing::warn!(
                        "Invalid configuration detected ({}), falling back to defaults",
                        err
                    );
                    let default_cfg = AppConfig::default();
                    if let Err(save_err) = default_cfg.save() {
                        tracing::warn!("Failed to persist default configuration: {}", save_err);
                    }
                    default_cfg
                } else {
                    cfg
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {}. Using defaults",
                    err
                );
                AppConfig::default()
            }
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with default settings
pub fn init() -> anyhow::Result<()> {
    utils::logging::init_tracing(None);
    tracing::info!("{} v{} initialized", NAME, VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "ytdlp-desk");
    }
}
