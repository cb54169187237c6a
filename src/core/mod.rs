//! Core business logic module
//!
//! This module contains the domain models, configuration, the yt-dlp process
//! supervisor and the download history.

pub mod config;
pub mod history;
pub mod models;
pub mod progress_parser;
pub mod ytdlp;


// Re-export commonly used types
pub use config::{AppConfig, YtDlpConfig};
pub use history::DownloadHistory;
pub use ytdlp::{DownloadHandle, YtDlp};
