//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::models::DownloadOptions;

pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Environment variables that override the persisted tool locations
pub const ENV_BINARY_PATH: &str = "YTDLP_PATH";
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const ENV_DOWNLOAD_DIR: &str = "YTDLP_DOWNLOAD_DIR";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub ytdlp: YtDlpConfig,
    pub defaults: DownloadDefaults,
    pub log_level: String, // "error", "warn", "info", "debug", "trace"
}

/// Where the external tools live and where downloads land
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtDlpConfig {
    pub binary_path: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    /// Working directory for yt-dlp; relative `-o` templates resolve here
    pub download_dir: Option<PathBuf>,
}

/// Settings used to build options when the caller supplies none
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadDefaults {
    pub format: Option<String>,
    pub output_template: Option<String>,
    pub no_check_certificate: bool,
    pub extra_args: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ytdlp: YtDlpConfig::default(),
            defaults: DownloadDefaults::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(DEFAULT_BINARY),
            ffmpeg_path: None,
            download_dir: None,
        }
    }
}

impl Default for DownloadDefaults {
    fn default() -> Self {
        Self {
            format: Some("bv*+ba/b".to_string()),
            output_template: Some("%(title)s.%(ext)s".to_string()),
            no_check_certificate: false,
            extra_args: Vec::new(),
        }
    }
}

impl DownloadDefaults {
    pub fn to_options(&self) -> DownloadOptions {
        let mut options = DownloadOptions::new()
            .with_no_check_certificate(self.no_check_certificate)
            .with_extra_args(self.extra_args.iter().cloned());
        if let Some(format) = &self.format {
            options = options.with_format(format.clone());
        }
        if let Some(template) = &self.output_template {
            options = options.with_output_template(template.clone());
        }
        options
    }
}

impl YtDlpConfig {
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = path.into();
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(binary) = non_empty(ENV_BINARY_PATH) {
            self.binary_path = PathBuf::from(binary);
        }
        if let Some(ffmpeg) = non_empty(ENV_FFMPEG_PATH) {
            self.ffmpeg_path = Some(PathBuf::from(ffmpeg));
        }
        if let Some(dir) = non_empty(ENV_DOWNLOAD_DIR) {
            self.download_dir = Some(PathBuf::from(dir));
        }
    }
}

impl AppConfig {
    /// Load configuration from file, creating default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Log level stored in the config file, read without creating or logging
    /// anything so the subscriber can be installed before the full load.
    pub fn stored_log_level() -> Option<String> {
        Self::get_config_path()
            .ok()
            .and_then(|path| Self::log_level_from(&path))
    }

    pub fn log_level_from(path: &Path) -> Option<String> {
        let content = std::fs::read_to_string(path).ok()?;
        let config: AppConfig = serde_json::from_str(&content).ok()?;
        config.validate().ok()?;
        Some(config.log_level)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = self.export()?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved configuration to: {:?}", path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "ytdlpdesk", "ytdlp-desk")
            .with_context(|| "Failed to get project directories")?;

        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Reset configuration to defaults
    pub fn reset() -> Result<Self> {
        let config = Self::default();
        config.save()?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Export configuration as JSON string
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    /// Parse and validate configuration from a JSON string
    pub fn import(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).with_context(|| "Failed to parse imported configuration")?;

        config
            .validate()
            .with_context(|| "Imported configuration is invalid")?;

        Ok(config)
    }

    /// Apply `YTDLP_PATH`, `FFMPEG_PATH` and `YTDLP_DOWNLOAD_DIR`
    pub fn apply_env_overrides(&mut self) {
        self.ytdlp.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn validate(&self) -> Result<()> {
        if self.ytdlp.binary_path.as_os_str().is_empty() {
            anyhow::bail!("yt-dlp binary path must not be empty");
        }

        if let Some(ffmpeg) = &self.ytdlp.ffmpeg_path {
            if ffmpeg.as_os_str().is_empty() {
                anyhow::bail!("ffmpeg path must not be empty when set");
            }
        }

        if let Some(dir) = &self.ytdlp.download_dir {
            if dir.exists() && !dir.is_dir() {
                anyhow::bail!("Download directory is not a directory: {:?}", dir);
            }
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.log_level);
        }

        Ok(())
    }
}
