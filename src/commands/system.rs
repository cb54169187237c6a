//! System command handlers
//!
//! Tool availability checks used by onboarding, and URL helpers used by
//! clipboard monitoring.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::config::YtDlpConfig;
use crate::core::ytdlp::{probe_tool, YtDlp};
use crate::utils::validation;
use crate::AppState;

const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Which external tools are usable, with their reported versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub yt_dlp_version: Option<String>,
    pub ffmpeg_version: Option<String>,
}

impl ToolStatus {
    pub fn ready(&self) -> bool {
        self.yt_dlp_version.is_some() && self.ffmpeg_version.is_some()
    }
}

/// Check if yt-dlp is available, returning its version
pub async fn check_yt_dlp(state: &AppState) -> Option<String> {
    info!("📺 Checking yt-dlp availability");

    let ytdlp = YtDlp::new(state.config.read().await.ytdlp.clone());
    let version = ytdlp.version().await;
    match &version {
        Some(version) => info!("✅ yt-dlp {} is available", version),
        None => warn!("⚠️ yt-dlp is not available"),
    }
    version
}

/// Check if FFmpeg is available, returning its banner line
pub async fn check_ffmpeg(state: &AppState) -> Option<String> {
    info!("🎬 Checking FFmpeg availability");

    let ffmpeg = ffmpeg_binary(&state.config.read().await.ytdlp);
    let version = probe_tool(&ffmpeg, "-version").await;
    match &version {
        Some(_) => info!("✅ FFmpeg is available"),
        None => warn!("⚠️ FFmpeg is not available at {:?}", ffmpeg),
    }
    version
}

pub async fn check_tools(state: &AppState) -> ToolStatus {
    ToolStatus {
        yt_dlp_version: check_yt_dlp(state).await,
        ffmpeg_version: check_ffmpeg(state).await,
    }
}

/// Return the YouTube URL contained in clipboard text, if any
pub fn detect_download_url(text: &str) -> Option<String> {
    let detected = validation::detect_download_url(text);
    if let Some(url) = &detected {
        info!("🔍 Detected downloadable URL: {}", url);
    }
    detected
}

/// Validate if a URL can be handed to yt-dlp
pub fn validate_url(url: &str) -> bool {
    validation::is_valid_video_url(url.trim())
}

fn ffmpeg_binary(config: &YtDlpConfig) -> PathBuf {
    config
        .ffmpeg_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG))
}
