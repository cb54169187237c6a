//! yt-dlp process supervisor
//!
//! Launches the external `yt-dlp` binary for one URL, merges its stdout and
//! stderr into a single line stream, classifies every line as progress or log
//! output and reports a single terminal outcome. Cancellation is cooperative
//! at the process level: the handle raises a flag and the supervising task
//! kills the child, which closes the pipes and unblocks the reader.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::YtDlpConfig;
use super::models::{AppError, AppResult, DownloadEvent, DownloadOptions, DownloadState};
use super::progress_parser::classify_line;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

type LineResult = std::io::Result<String>;

/// Supervisor for yt-dlp invocations sharing one tool configuration
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: YtDlpConfig,
}

/// State shared between a handle and its supervising task
struct Shared {
    cancelled: AtomicBool,
    wake: Notify,
    state: Mutex<DownloadState>,
}

impl Shared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            wake: Notify::new(),
            state: Mutex::new(DownloadState::NotStarted),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Caller-owned reference to one running yt-dlp process.
///
/// Dropping the handle does not stop the download; call [`cancel`](Self::cancel).
pub struct DownloadHandle {
    id: String,
    url: String,
    shared: Arc<Shared>,
    task: JoinHandle<DownloadState>,
}

impl std::fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl DownloadHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request termination. Idempotent, never blocks, and does nothing once
    /// the process has already been reaped.
    pub fn cancel(&self) {
        let state = self.shared.state.lock();
        if state.is_finished() {
            return;
        }
        if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
            info!(download_id = %self.id, "Cancelling yt-dlp download");
            self.shared.wake.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    pub fn state(&self) -> DownloadState {
        *self.shared.state.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Wait for the supervising task and return the final state
    pub async fn wait(self) -> AppResult<DownloadState> {
        self.task
            .await
            .map_err(|e| AppError::System(format!("Download supervisor failed: {}", e)))
    }
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &YtDlpConfig {
        &self.config
    }

    /// Full argument vector for one download, binary first.
    pub fn command_line(&self, url: &str, options: &DownloadOptions) -> Vec<String> {
        let mut argv = vec![
            self.config.binary_path.to_string_lossy().into_owned(),
            "--newline".to_string(),
        ];

        if let Some(ffmpeg) = &self.config.ffmpeg_path {
            argv.push("--ffmpeg-location".to_string());
            argv.push(ffmpeg.to_string_lossy().into_owned());
        }
        if options.no_check_certificate() {
            argv.push("--no-check-certificate".to_string());
        }
        if let Some(format) = options.format() {
            argv.push("-f".to_string());
            argv.push(format.to_string());
        }
        if let Some(template) = options.output_template() {
            argv.push("-o".to_string());
            argv.push(template.to_string());
        }
        argv.extend(options.extra_args().iter().cloned());
        argv.push(url.to_string());

        argv
    }

    /// Installed yt-dlp version, or `None` when the tool cannot be run
    pub async fn version(&self) -> Option<String> {
        probe_tool(&self.config.binary_path, "--version").await
    }

    /// Start a download, delivering events to `on_event` from the supervising task.
    ///
    /// Must be called from within a Tokio runtime. Spawn failures are returned
    /// directly; everything after a successful spawn arrives as events.
    pub async fn download<F>(
        &self,
        url: &str,
        options: &DownloadOptions,
        on_event: F,
    ) -> AppResult<DownloadHandle>
    where
        F: FnMut(DownloadEvent) + Send + 'static,
    {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput("URL must not be empty".to_string()));
        }

        let argv = self.command_line(url, options);
        let id = Uuid::new_v4().to_string();

        let mut command = Command::new(&self.config.binary_path);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.download_dir {
            command.current_dir(dir);
        }

        // Own process group so cancel reaches ffmpeg and other helpers too
        #[cfg(unix)]
        command.process_group(0);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn().map_err(|source| {
            error!(download_id = %id, "Failed to spawn {}: {}", argv[0], source);
            AppError::Spawn {
                binary: argv[0].clone(),
                source,
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::System("yt-dlp stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::System("yt-dlp stderr was not captured".to_string()))?;

        info!(download_id = %id, url = %url, "Started yt-dlp: {:?}", argv);

        let shared = Arc::new(Shared::new());
        *shared.state.lock() = DownloadState::Running;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump_lines(stdout, line_tx.clone()));
        tokio::spawn(pump_lines(stderr, line_tx));

        let task = tokio::spawn(supervise(
            id.clone(),
            child,
            line_rx,
            Arc::clone(&shared),
            on_event,
        ));

        Ok(DownloadHandle {
            id,
            url: url.to_string(),
            shared,
            task,
        })
    }

    /// Same as [`download`](Self::download), with events delivered over a channel.
    pub async fn download_channel(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> AppResult<(DownloadHandle, mpsc::UnboundedReceiver<DownloadEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self
            .download(url, options, move |event| {
                let _ = tx.send(event);
            })
            .await?;
        Ok((handle, rx))
    }
}

async fn supervise<F>(
    id: String,
    mut child: Child,
    mut lines: mpsc::UnboundedReceiver<LineResult>,
    shared: Arc<Shared>,
    mut on_event: F,
) -> DownloadState
where
    F: FnMut(DownloadEvent),
{
    on_event(DownloadEvent::Started);

    let mut kill_sent = false;
    let mut reaped = None;
    loop {
        if !kill_sent && shared.is_cancelled() {
            kill_sent = true;
            kill_process_tree(&id, &mut child);
        }

        tokio::select! {
            next = lines.recv() => match next {
                Some(Ok(line)) => {
                    // Output racing a cancel is dropped
                    if !shared.is_cancelled() {
                        on_event(classify_line(&line));
                    }
                }
                Some(Err(err)) => {
                    if !shared.is_cancelled() {
                        warn!(download_id = %id, "Failed to read yt-dlp output: {}", err);
                        on_event(DownloadEvent::error(
                            format!("Failed to read yt-dlp output: {}", err),
                            Some(err),
                        ));
                    }
                }
                None => break,
            },
            // Woken by cancel(); the kill happens at the top of the loop
            _ = shared.wake.notified(), if !kill_sent => {}
            // A descendant may still hold the pipes open after the kill
            status = child.wait(), if kill_sent => {
                reaped = Some(status);
                break;
            }
        }
    }

    let exit = match reaped {
        Some(status) => status,
        None => child.wait().await,
    };

    let (final_state, terminal) = {
        let mut state = shared.state.lock();
        let outcome = match exit {
            _ if shared.is_cancelled() => (DownloadState::Cancelled, DownloadEvent::Cancelled),
            Ok(status) => {
                let exit_code = status.code().unwrap_or(-1);
                (
                    DownloadState::Completed { exit_code },
                    DownloadEvent::Completed { exit_code },
                )
            }
            Err(err) => (
                DownloadState::Errored,
                DownloadEvent::fatal(format!("Failed to wait for yt-dlp: {}", err), Some(err)),
            ),
        };
        *state = outcome.0;
        outcome
    };

    match &final_state {
        DownloadState::Completed { exit_code: 0 } => {
            info!(download_id = %id, "yt-dlp finished successfully")
        }
        DownloadState::Completed { exit_code } => {
            warn!(download_id = %id, exit_code, "yt-dlp exited with non-zero status")
        }
        DownloadState::Cancelled => info!(download_id = %id, "yt-dlp download cancelled"),
        _ => error!(download_id = %id, "yt-dlp supervision failed"),
    }

    on_event(terminal);
    final_state
}

/// Kill the child and, on unix, every process in its group.
fn kill_process_tree(id: &str, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The group id equals the child pid, see `process_group(0)` at spawn
        if unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) } != 0 {
            debug!(
                download_id = %id,
                "Process group kill ignored: {}",
                std::io::Error::last_os_error()
            );
        }
    }

    if let Err(err) = child.start_kill() {
        debug!(download_id = %id, "Kill request ignored: {}", err);
    }
}

/// Forward every line of `reader` into `tx` until end-of-stream.
async fn pump_lines<R>(reader: R, tx: mpsc::UnboundedSender<LineResult>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
                if tx.send(Ok(line.to_string())).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}

/// Run `binary arg` and return the first stdout line on a clean exit.
///
/// Any failure means "not installed" and yields `None`.
pub(crate) async fn probe_tool(binary: &Path, arg: &str) -> Option<String> {
    let mut command = Command::new(binary);
    command
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW);

    let output = match command.output().await {
        Ok(output) => output,
        Err(e) => {
            debug!("Could not run {:?} {}: {}", binary, arg, e);
            return None;
        }
    };

    if !output.status.success() {
        debug!("{:?} {} exited with {}", binary, arg, output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next().map(str::trim).unwrap_or_default();
    if first_line.is_empty() {
        None
    } else {
        Some(first_line.to_string())
    }
}
