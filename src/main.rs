use std::env;
use std::process::ExitCode;

use ytdlp_desk::commands::system::check_tools;
use ytdlp_desk::{AppConfig, AppState, DownloadEvent, DownloadState, YtDlp};

const USAGE: &str = "Usage: ytdlp-desk <version | check | download <url> [format] [template]>";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    // Subscriber first, so config fallback warnings reach stderr
    let log_level = AppConfig::stored_log_level();
    ytdlp_desk::utils::logging::init_tracing(log_level.as_deref());
    let state = AppState::load();

    match args.first().map(String::as_str) {
        Some("version") => print_version(&state).await,
        Some("check") => print_tool_status(&state).await,
        Some("download") => match args.get(1) {
            Some(url) => run_download(&state, url, args.get(2), args.get(3)).await,
            None => usage(),
        },
        _ => usage(),
    }
}

fn usage() -> ExitCode {
    eprintln!("{USAGE}");
    ExitCode::FAILURE
}

async fn print_version(state: &AppState) -> ExitCode {
    let ytdlp = YtDlp::new(state.config.read().await.ytdlp.clone());
    match ytdlp.version().await {
        Some(version) => {
            println!("{version}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("yt-dlp is not installed or not runnable");
            ExitCode::FAILURE
        }
    }
}

async fn print_tool_status(state: &AppState) -> ExitCode {
    let status = check_tools(state).await;
    println!(
        "yt-dlp: {}",
        status.yt_dlp_version.as_deref().unwrap_or("missing")
    );
    println!(
        "ffmpeg: {}",
        status.ffmpeg_version.as_deref().unwrap_or("missing")
    );
    if status.ready() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_download(
    state: &AppState,
    url: &str,
    format: Option<&String>,
    template: Option<&String>,
) -> ExitCode {
    let (ytdlp, mut options) = {
        let config = state.config.read().await;
        (
            YtDlp::new(config.ytdlp.clone()),
            config.defaults.to_options(),
        )
    };
    if let Some(format) = format {
        options = options.with_format(format.clone());
    }
    if let Some(template) = template {
        options = options.with_output_template(template.clone());
    }

    let (handle, mut events) = match ytdlp.download_channel(url, &options).await {
        Ok(started) => started,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    print_event(&event);
                    if event.is_terminal() {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !handle.is_cancelled() => handle.cancel(),
        }
    }

    match handle.wait().await {
        Ok(DownloadState::Completed { exit_code }) => {
            ExitCode::from(u8::try_from(exit_code).unwrap_or(1))
        }
        Ok(DownloadState::Cancelled) => ExitCode::from(130),
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_event(event: &DownloadEvent) {
    match event {
        DownloadEvent::Started => println!("started"),
        DownloadEvent::Progress {
            percent: Some(percent),
            ..
        } => println!("progress {percent:.1}%"),
        DownloadEvent::Progress { raw_line, .. } => println!("{raw_line}"),
        DownloadEvent::Log { line } => println!("{line}"),
        DownloadEvent::Completed { exit_code } => println!("completed (exit code {exit_code})"),
        DownloadEvent::Cancelled => println!("cancelled"),
        DownloadEvent::Error { message, .. } => eprintln!("error: {message}"),
    }
}
