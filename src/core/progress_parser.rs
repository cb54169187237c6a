//! Percentage extraction for yt-dlp `--newline` output

use regex::Regex;
use std::sync::OnceLock;

use super::models::DownloadEvent;

fn percent_regex() -> &'static Regex {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    PERCENT.get_or_init(|| Regex::new(r"(\d{1,3}(?:[.,]\d+)?)%").expect("valid percent regex"))
}

/// Returns the matched percentage token, decimal comma normalized.
fn percent_token(line: &str) -> Option<String> {
    percent_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace(',', "."))
}

/// Extract the first percentage in `line`, if it lies within 0..=100.
pub fn parse_percent(line: &str) -> Option<f64> {
    percent_token(line)?
        .parse::<f64>()
        .ok()
        .filter(|value| (0.0..=100.0).contains(value))
}

/// Turn one output line into a `Progress` or `Log` event.
///
/// A line carrying a percent token whose value is out of range still counts
/// as progress, just without a usable percentage.
pub fn classify_line(line: &str) -> DownloadEvent {
    if percent_token(line).is_some() {
        DownloadEvent::Progress {
            percent: parse_percent(line),
            raw_line: line.to_string(),
        }
    } else {
        DownloadEvent::Log {
            line: line.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typical_download_line() {
        let line = "[download]  42.0% of   10.00MiB at    1.21MiB/s ETA 00:05";
        assert_eq!(parse_percent(line), Some(42.0));
        assert_eq!(parse_percent("  42.0% of ..."), Some(42.0));
    }

    #[test]
    fn test_parse_whole_and_comma_percent() {
        assert_eq!(parse_percent("100% of 10MiB"), Some(100.0));
        assert_eq!(parse_percent("75,5%"), Some(75.5));
        assert_eq!(parse_percent("[download]   0.0% of ~ 3.10MiB"), Some(0.0));
    }

    #[test]
    fn test_no_percent_token() {
        assert_eq!(parse_percent("[youtube] dQw4w9WgXcQ: Downloading webpage"), None);
        assert_eq!(parse_percent("percent sign alone %"), None);
        assert_eq!(parse_percent(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(parse_percent("frag 12.5% then 80%"), Some(12.5));
    }

    #[test]
    fn test_out_of_range_token() {
        assert_eq!(parse_percent("ratio 250%"), None);

        match classify_line("ratio 250%") {
            DownloadEvent::Progress { percent, raw_line } => {
                assert_eq!(percent, None);
                assert_eq!(raw_line, "ratio 250%");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_classify_line() {
        match classify_line("[download]  99.9% of 1.00GiB") {
            DownloadEvent::Progress { percent, raw_line } => {
                assert_eq!(percent, Some(99.9));
                assert_eq!(raw_line, "[download]  99.9% of 1.00GiB");
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        match classify_line("[Merger] Merging formats into \"video.mkv\"") {
            DownloadEvent::Log { line } => assert!(line.starts_with("[Merger]")),
            other => panic!("Unexpected event: {:?}", other),
        }
    }
}
