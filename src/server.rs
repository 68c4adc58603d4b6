use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use eyre::{Result, WrapErr};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::signal;

use crate::metadata::MetadataSource;
use crate::summarize::Summarizer;
use crate::youtube::{self, TranscriptSource};
use crate::{Error, SummaryResult, VideoMetadata, extract_video_id};

/// Everything a request needs; shared read-only between requests
#[derive(Clone)]
pub struct Pipeline {
    pub sources: Vec<Arc<dyn TranscriptSource>>,
    pub metadata: Arc<dyn MetadataSource>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    /// Transcript, best-effort metadata, then the model
    pub async fn summarize(&self, url: Option<&str>) -> Result<SummaryResult, Error> {
        let video_id = require_video_id(url)?;

        info!("summarize {video_id}: fetching transcript");
        let transcript = youtube::fetch_transcript(&self.sources, &video_id).await?;

        info!("summarize {video_id}: fetching metadata");
        let video = self.metadata.fetch(&video_id).await.ok();

        info!("summarize {video_id}: sending {} chars to the model", transcript.chars().count());
        let summary = self.summarizer.summarize(&transcript).await?;

        Ok(SummaryResult { summary, video })
    }

    pub async fn preview(&self, url: Option<&str>) -> Result<VideoMetadata, Error> {
        let video_id = require_video_id(url)?;
        info!("preview {video_id}: fetching metadata");
        self.metadata.fetch(&video_id).await
    }
}

fn require_video_id(url: Option<&str>) -> Result<String, Error> {
    match url.map(str::trim) {
        None | Some("") => Err(Error::MissingUrl),
        Some(url) => extract_video_id(url),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewResponse {
    pub video: VideoMetadata,
}

#[derive(Debug)]
struct HttpError(Error);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        warn!("{status}: {}", self.0);
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// An unreadable body is treated like one without a URL
fn url_of(payload: &Result<Json<UrlRequest>, JsonRejection>) -> Option<&str> {
    payload.as_ref().ok().and_then(|Json(req)| req.url.as_deref())
}

async fn summarize(
    State(pipeline): State<Arc<Pipeline>>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>, HttpError> {
    Ok(Json(pipeline.summarize(url_of(&payload)).await?))
}

async fn preview(
    State(pipeline): State<Arc<Pipeline>>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, HttpError> {
    let video = pipeline.preview(url_of(&payload)).await?;
    Ok(Json(PreviewResponse { video }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "OK", "message": "TLDV backend is running"}))
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/summarize", post(summarize))
        .route("/preview", post(preview))
        .route("/health", get(health))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(Arc::new(pipeline))
}

/// Serve until Ctrl+C
pub async fn serve(pipeline: Pipeline, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("TLDV backend running at http://{addr}");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running HTTP server")
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::Segment;

    struct Captions(Option<Vec<&'static str>>);

    #[async_trait]
    impl TranscriptSource for Captions {
        fn name(&self) -> &str {
            "fake captions"
        }

        async fn fetch(&self, _video_id: &str) -> eyre::Result<Vec<Segment>> {
            match &self.0 {
                Some(texts) => Ok(texts
                    .iter()
                    .map(|t| Segment {
                        text: t.to_string(),
                        start: 0.0,
                        duration: 0.0,
                    })
                    .collect()),
                None => eyre::bail!("no captions"),
            }
        }
    }

    struct Meta(Option<VideoMetadata>);

    #[async_trait]
    impl MetadataSource for Meta {
        async fn fetch(&self, _video_id: &str) -> Result<VideoMetadata, Error> {
            self.0.clone().ok_or(Error::MetadataUnavailable)
        }
    }

    #[derive(Default)]
    struct Model {
        reply: Option<Result<String, Error>>,
        seen: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for Model {
        async fn summarize(&self, transcript: &str) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(transcript.to_string());
            self.reply.clone().unwrap_or_else(|| Ok("model says hi".to_string()))
        }
    }

    fn video() -> VideoMetadata {
        VideoMetadata {
            title: "Test Video".to_string(),
            thumbnail: "https://i.ytimg.com/vi/abc123/hqdefault.jpg".to_string(),
            author: "Test Channel".to_string(),
            duration: None,
        }
    }

    fn pipeline(owner: Option<Vec<&'static str>>, auto: Option<Vec<&'static str>>, meta: Option<VideoMetadata>, model: Arc<Model>) -> Pipeline {
        Pipeline {
            sources: vec![Arc::new(Captions(owner)), Arc::new(Captions(auto))],
            metadata: Arc::new(Meta(meta)),
            summarizer: model,
        }
    }

    async fn post_json(router: Router, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_summarize_returns_literal_model_output() {
        let model = Arc::new(Model::default());
        let app = router(pipeline(Some(vec!["Hello", "world"]), None, Some(video()), model.clone()));

        let (status, body) = post_json(app, "/summarize", r#"{"url":"https://www.youtube.com/watch?v=abc123"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "model says hi");
        assert_eq!(body["video"]["title"], "Test Video");
        assert!(body["video"].get("duration").is_none());
        assert_eq!(model.seen.lock().unwrap().as_slice(), ["Hello world".to_string()]);
    }

    #[tokio::test]
    async fn test_summarize_without_any_transcript() {
        let model = Arc::new(Model::default());
        let app = router(pipeline(None, Some(vec![]), Some(video()), model.clone()));

        let (status, body) = post_json(app, "/summarize", r#"{"url":"https://youtu.be/xyz789"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No transcript available for this video."}));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_does_not_block_summary() {
        let model = Arc::new(Model::default());
        let p = pipeline(Some(vec!["spoken"]), None, None, model);
        let url = r#"{"url":"https://www.youtube.com/watch?v=abc123"}"#;

        let (status, body) = post_json(router(p.clone()), "/preview", url).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Unable to fetch metadata."}));

        let (status, body) = post_json(router(p), "/summarize", url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"summary": "model says hi"}));
    }

    #[tokio::test]
    async fn test_preview_returns_video() {
        let app = router(pipeline(None, None, Some(video()), Arc::default()));
        let (status, body) = post_json(app, "/preview", r#"{"url":"https://youtu.be/abc123"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["video"]["author"], "Test Channel");
        assert_eq!(body["video"]["thumbnail"], "https://i.ytimg.com/vi/abc123/hqdefault.jpg");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_urls() {
        let p = pipeline(Some(vec!["x"]), None, Some(video()), Arc::default());

        for body in [r#"{}"#, r#"{"url":""}"#, "not json"] {
            let (status, resp) = post_json(router(p.clone()), "/summarize", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp, json!({"error": "Missing YouTube URL."}));
        }

        let (status, resp) = post_json(router(p.clone()), "/summarize", r#"{"url":"not a url"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "Invalid YouTube URL."}));

        let (status, resp) = post_json(router(p), "/preview", r#"{"url":"https://www.youtube.com/"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "Invalid YouTube URL."}));
    }

    #[tokio::test]
    async fn test_model_errors_map_to_status() {
        let url = r#"{"url":"https://www.youtube.com/watch?v=abc123"}"#;

        let too_long = Arc::new(Model {
            reply: Some(Err(Error::ContextTooLong)),
            ..Default::default()
        });
        let (status, body) = post_json(router(pipeline(Some(vec!["x"]), None, None, too_long)), "/summarize", url).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], Error::ContextTooLong.to_string());

        let failed = Arc::new(Model {
            reply: Some(Err(Error::SummarizationFailed)),
            ..Default::default()
        });
        let (status, body) = post_json(router(pipeline(Some(vec!["x"]), None, None, failed)), "/summarize", url).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Summarization request failed."}));
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(pipeline(None, None, None, Arc::default()));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "OK");
    }
}
