//! In-memory download history
//!
//! Tracks every download started through the app layer so the history screen
//! can show what ran, how far it got and how it ended. Nothing is persisted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::models::DownloadEvent;

/// Download status as shown in the history list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl HistoryStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One row of the download history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub status: HistoryStatus,
    /// Last known percentage, 0-100
    pub progress: Option<f64>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub last_line: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Aggregate counts over the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatistics {
    pub total_downloads: usize,
    pub running_downloads: usize,
    pub completed_downloads: usize,
    pub failed_downloads: usize,
    pub cancelled_downloads: usize,
    /// Mean progress of running downloads that have reported any
    pub average_progress: f64,
}

/// Cheaply cloneable history shared between the app layer and event callbacks
#[derive(Debug, Clone, Default)]
pub struct DownloadHistory {
    entries: Arc<RwLock<HashMap<String, HistoryEntry>>>,
}

impl DownloadHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self, id: &str, url: &str) {
        let entry = HistoryEntry {
            id: id.to_string(),
            url: url.to_string(),
            status: HistoryStatus::Running,
            progress: None,
            exit_code: None,
            error: None,
            last_line: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.entries.write().insert(id.to_string(), entry);
    }

    /// Fold one supervisor event into the entry for `id`.
    ///
    /// A zero exit code counts as completed, any other as failed.
    pub fn apply_event(&self, id: &str, event: &DownloadEvent) {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(id) else {
            return;
        };
        if entry.status.is_finished() {
            return;
        }

        match event {
            DownloadEvent::Started => {}
            DownloadEvent::Progress { percent, raw_line } => {
                if percent.is_some() {
                    entry.progress = *percent;
                }
                entry.last_line = Some(raw_line.clone());
            }
            DownloadEvent::Log { line } => entry.last_line = Some(line.clone()),
            DownloadEvent::Completed { exit_code } => {
                entry.exit_code = Some(*exit_code);
                entry.status = if *exit_code == 0 {
                    entry.progress = Some(100.0);
                    HistoryStatus::Completed
                } else {
                    HistoryStatus::Failed
                };
                entry.finished_at = Some(Utc::now());
            }
            DownloadEvent::Cancelled => {
                entry.status = HistoryStatus::Cancelled;
                entry.finished_at = Some(Utc::now());
            }
            DownloadEvent::Error {
                message, fatal, ..
            } => {
                entry.error = Some(message.clone());
                if *fatal {
                    entry.status = HistoryStatus::Failed;
                    entry.finished_at = Some(Utc::now());
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.entries.read().get(id).cloned()
    }

    /// All entries, newest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        entries
    }

    pub fn statistics(&self) -> HistoryStatistics {
        let entries = self.entries.read();

        let mut stats = HistoryStatistics {
            total_downloads: entries.len(),
            ..Default::default()
        };

        let mut progress_samples = Vec::new();

        for entry in entries.values() {
            match entry.status {
                HistoryStatus::Running => {
                    stats.running_downloads += 1;
                    if let Some(progress) = entry.progress {
                        progress_samples.push(progress);
                    }
                }
                HistoryStatus::Completed => stats.completed_downloads += 1,
                HistoryStatus::Failed => stats.failed_downloads += 1,
                HistoryStatus::Cancelled => stats.cancelled_downloads += 1,
            }
        }

        if !progress_samples.is_empty() {
            stats.average_progress =
                progress_samples.iter().sum::<f64>() / progress_samples.len() as f64;
        }

        stats
    }

    /// Drop finished entries, returning how many were removed
    pub fn cleanup_finished(&self) -> usize {
        let mut entries = self.entries.write();
        let initial_count = entries.len();

        entries.retain(|_id, entry| !entry.status.is_finished());

        let removed_count = initial_count - entries.len();
        if removed_count > 0 {
            info!("Cleaned up {} finished downloads from history", removed_count);
        }

        removed_count
    }
}
