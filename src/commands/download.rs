//! Download management commands

use tracing::{error, info};

use crate::core::history::{HistoryEntry, HistoryStatistics};
use crate::core::models::{AppResult, DownloadOptions, DownloadUpdate};
use crate::core::ytdlp::YtDlp;
use crate::AppState;

/// Start downloading `url`, returning the download id.
///
/// When `options` is `None` the configured defaults are used. The handle is
/// kept in the state until its terminal event arrives.
pub async fn start_download(
    state: &AppState,
    url: String,
    options: Option<DownloadOptions>,
) -> AppResult<String> {
    info!("[START_DOWNLOAD_CMD] Starting download for: {}", url);

    let (ytdlp, options) = {
        let config = state.config.read().await;
        let options = options.unwrap_or_else(|| config.defaults.to_options());
        (YtDlp::new(config.ytdlp.clone()), options)
    };

    let (handle, mut events) = match ytdlp.download_channel(&url, &options).await {
        Ok(started) => started,
        Err(e) => {
            error!("[START_DOWNLOAD_CMD] ❌ Failed to start download for {}: {}", url, e);
            return Err(e);
        }
    };

    let download_id = handle.id().to_string();
    state.history.record_started(&download_id, handle.url());
    state
        .active_downloads
        .lock()
        .insert(download_id.clone(), handle);

    let task_state = state.clone();
    let task_id = download_id.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            task_state.history.apply_event(&task_id, &event);
            let terminal = event.is_terminal();
            task_state.publish(DownloadUpdate {
                download_id: task_id.clone(),
                event,
            });
            if terminal {
                break;
            }
        }
        task_state.active_downloads.lock().remove(&task_id);
    });

    info!(
        "[START_DOWNLOAD_CMD] ✅ Download started with ID: {}",
        download_id
    );
    Ok(download_id)
}

/// Cancel an active download. Returns `false` when the id is not active.
pub fn cancel_download(state: &AppState, download_id: &str) -> bool {
    info!("[CANCEL_CMD] Cancelling download: {}", download_id);

    let active = state.active_downloads.lock();
    match active.get(download_id) {
        Some(handle) => {
            handle.cancel();
            true
        }
        None => {
            info!("[CANCEL_CMD] No active download with ID: {}", download_id);
            false
        }
    }
}

/// Cancel every active download, returning how many were signalled
pub fn cancel_all_downloads(state: &AppState) -> usize {
    let active = state.active_downloads.lock();
    for handle in active.values() {
        handle.cancel();
    }
    info!("[CANCEL_ALL_CMD] Cancelled {} downloads", active.len());
    active.len()
}

pub fn get_active_download_ids(state: &AppState) -> Vec<String> {
    state.active_downloads.lock().keys().cloned().collect()
}

pub fn get_download_history(state: &AppState) -> Vec<HistoryEntry> {
    state.history.entries()
}

pub fn get_download_stats(state: &AppState) -> HistoryStatistics {
    state.history.statistics()
}

/// Remove finished downloads from the history list
pub fn clear_finished_downloads(state: &AppState) -> usize {
    state.history.cleanup_finished()
}
