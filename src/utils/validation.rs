//! URL and input validation utilities

use url::Url;

const YOUTUBE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Check if URL is a valid video URL
pub fn is_valid_video_url(url: &str) -> bool {
    if let Ok(parsed) = Url::parse(url) {
        let scheme = parsed.scheme();
        scheme == "http" || scheme == "https"
    } else {
        false
    }
}

/// Check if URL points at YouTube
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    parsed
        .host_str()
        .map(|host| YOUTUBE_HOSTS.contains(&host.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Find the first YouTube URL in free text, e.g. clipboard contents.
pub fn detect_download_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| {
            token.trim_matches(|c: char| matches!(c, '"' | '\'' | '<' | '>' | '(' | ')' | ','))
        })
        .find(|token| is_youtube_url(token))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_url_validation() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtube.com/watch?v=test123"));

        assert!(!is_youtube_url("https://example.com/video"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=x"));
        assert!(!is_youtube_url("ftp://youtube.com/watch?v=x"));
        assert!(!is_youtube_url("not_a_url"));
        assert!(!is_youtube_url(""));
    }

    #[test]
    fn test_detect_download_url() {
        let text = "check this out (https://youtu.be/dQw4w9WgXcQ), it's great";
        assert_eq!(
            detect_download_url(text),
            Some("https://youtu.be/dQw4w9WgXcQ".to_string())
        );

        assert_eq!(detect_download_url("https://example.com/a https://vimeo.com/1"), None);
        assert_eq!(detect_download_url(""), None);
    }

    #[test]
    fn test_video_url() {
        assert!(is_valid_video_url("https://example.com/v.mp4"));
        assert!(!is_valid_video_url("file:///tmp/v.mp4"));
        assert!(!is_valid_video_url("::nope"));
    }
}
