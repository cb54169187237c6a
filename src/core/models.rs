//! Core data models for the yt-dlp download backend

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Options for a single yt-dlp invocation.
///
/// Built once through the consuming setters and never mutated afterwards.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]

pub struct DownloadOptions {
    format: Option<String>,

    output_template: Option<String>,

    no_check_certificate: bool,

    extra_args: Vec<String>,
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// yt-dlp format selector, passed as `-f`
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Output filename template, passed as `-o`
    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = Some(template.into());
        self
    }

    pub fn with_no_check_certificate(mut self, enabled: bool) -> Self {
        self.no_check_certificate = enabled;
        self
    }

    /// Free-form arguments appended after the known flags, order preserved
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn output_template(&self) -> Option<&str> {
        self.output_template.as_deref()
    }

    pub fn no_check_certificate(&self) -> bool {
        self.no_check_certificate
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }
}

/// Event emitted while supervising a yt-dlp process.
///
/// Every invocation produces `Started`, then any number of `Progress`/`Log`
/// events, then exactly one terminal event.

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]

pub enum DownloadEvent {
    Started,

    Progress {
        percent: Option<f64>,
        raw_line: String,
    },

    Log {
        line: String,
    },

    Completed {
        exit_code: i32,
    },

    Cancelled,

    /// `fatal` marks the unrecoverable variant that ends the stream
    Error {
        message: String,
        fatal: bool,
        #[serde(skip)]
        cause: Option<Arc<std::io::Error>>,
    },
}

impl DownloadEvent {
    pub(crate) fn error(message: impl Into<String>, cause: Option<std::io::Error>) -> Self {
        Self::Error {
            message: message.into(),
            fatal: false,
            cause: cause.map(Arc::new),
        }
    }

    pub(crate) fn fatal(message: impl Into<String>, cause: Option<std::io::Error>) -> Self {
        Self::Error {
            message: message.into(),
            fatal: true,
            cause: cause.map(Arc::new),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled | Self::Error { fatal: true, .. }
        )
    }
}

/// Event tagged with the download it belongs to, as broadcast to the UI

#[derive(Debug, Clone, Serialize)]

pub struct DownloadUpdate {
    pub download_id: String,

    pub event: DownloadEvent,
}

/// Lifecycle of one supervised process

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]

pub enum DownloadState {
    NotStarted,

    Running,

    Completed { exit_code: i32 },

    Cancelled,

    Errored,
}

impl DownloadState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled | Self::Errored
        )
    }
}

/// Application error types

#[derive(Debug, thiserror::Error)]

pub enum AppError {
    #[error("Failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("System error: {0}")]
    System(String),
}

/// Result type alias for application operations

pub type AppResult<T> = Result<T, AppError>;
