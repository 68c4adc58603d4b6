pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod metadata;
pub mod output;
pub mod server;
pub mod summarize;
pub mod youtube;

use serde::{Deserialize, Serialize};

pub use error::Error;

/// A single captioned segment
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Basic video details shown alongside a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub author: String,
    /// Raw ISO-8601 duration, only known when the Data API key is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl VideoMetadata {
    /// Duration with the literal `PT` prefix stripped, e.g. `PT4M13S` -> `4M13S`
    pub fn display_duration(&self) -> Option<String> {
        self.duration.as_deref().map(|d| d.replacen("PT", "", 1))
    }
}

/// Result of one `/summarize` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoMetadata>,
}

/// Extract the video ID from a YouTube URL.
///
/// Uses the `v` query parameter when present, otherwise the last non-empty
/// path segment (`https://youtu.be/ID`). The ID itself is not validated.
pub fn extract_video_id(input: &str) -> Result<String, Error> {
    let url = url::Url::parse(input.trim()).map_err(|_| Error::InvalidUrl)?;

    if let Some((_, v)) = url.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
        return Ok(v.into_owned());
    }

    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .ok_or(Error::InvalidUrl)
}

/// Bind a router to an ephemeral local port and return its base URL.
#[cfg(test)]
pub(crate) async fn spawn_fake(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc123"),
            Ok("abc123".to_string())
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=120"),
            Ok("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/xyz789"), Ok("xyz789".to_string()));
    }

    #[test]
    fn test_short_url_trailing_slash() {
        assert_eq!(extract_video_id("https://youtu.be/xyz789/"), Ok("xyz789".to_string()));
    }

    #[test]
    fn test_query_param_wins_over_path() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/other?v=abc123"),
            Ok("abc123".to_string())
        );
    }

    #[test]
    fn test_empty_v_falls_back_to_path() {
        assert_eq!(extract_video_id("https://youtu.be/xyz789?v="), Ok("xyz789".to_string()));
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(extract_video_id("  https://youtu.be/xyz789  "), Ok("xyz789".to_string()));
    }

    #[test]
    fn test_unparseable_input() {
        assert_eq!(extract_video_id("not a url"), Err(Error::InvalidUrl));
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Err(Error::InvalidUrl));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_video_id(""), Err(Error::InvalidUrl));
    }

    #[test]
    fn test_no_id_anywhere() {
        assert_eq!(extract_video_id("https://www.youtube.com/"), Err(Error::InvalidUrl));
        assert_eq!(extract_video_id("mailto:someone@example.com"), Err(Error::InvalidUrl));
    }

    #[test]
    fn test_display_duration_strips_prefix_only() {
        let mut meta = VideoMetadata {
            title: "t".to_string(),
            thumbnail: "https://i.ytimg.com/vi/abc/hqdefault.jpg".to_string(),
            author: "a".to_string(),
            duration: Some("PT1H2M3S".to_string()),
        };
        assert_eq!(meta.display_duration().as_deref(), Some("1H2M3S"));

        meta.duration = None;
        assert_eq!(meta.display_duration(), None);
    }

    #[test]
    fn test_summary_result_omits_missing_video() {
        let result = SummaryResult {
            summary: "text".to_string(),
            video: None,
        };
        assert_eq!(serde_json::to_value(&result).unwrap(), serde_json::json!({"summary": "text"}));
    }
}
