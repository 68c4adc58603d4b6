use log::{debug, warn};
use serde::Deserialize;

use crate::history::{History, HistoryEntry};
use crate::server::{PreviewResponse, UrlRequest};
use crate::{SummaryResult, VideoMetadata};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The backend answered with an error message
    #[error("{0}")]
    Rejected(String),

    #[error("Could not connect to the server.")]
    Unreachable,

    #[error("A summary is already being generated.")]
    Busy,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Talks to a running backend over HTTP
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn summarize(&self, video_url: &str) -> Result<SummaryResult, ClientError> {
        let resp = self.post("summarize", video_url).await?;
        if resp.status().is_success() {
            return resp.json().await.map_err(|e| {
                warn!("Unreadable summary response: {e}");
                ClientError::Rejected("Something went wrong.".to_string())
            });
        }

        let status = resp.status();
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| "Something went wrong.".to_string());
        debug!("Backend returned {status}: {message}");
        Err(ClientError::Rejected(message))
    }

    /// Metadata for display only; any failure yields `None`
    pub async fn preview(&self, video_url: &str) -> Option<VideoMetadata> {
        if url::Url::parse(video_url.trim()).is_err() {
            return None;
        }
        let resp = self.post("preview", video_url).await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.json::<PreviewResponse>().await.ok().map(|p| p.video)
    }

    async fn post(&self, endpoint: &str, video_url: &str) -> Result<reqwest::Response, ClientError> {
        let body = UrlRequest {
            url: Some(video_url.to_string()),
        };
        self.client
            .post(format!("{}/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!("Backend unreachable: {e}");
                ClientError::Unreachable
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Submitting,
    Success(SummaryResult),
    Failed(String),
}

/// Client-side view of one user's summarization requests
#[derive(Debug, Default)]
pub struct Session {
    state: RequestState,
    preview: Option<VideoMetadata>,
    history: History,
}

impl Session {
    pub fn with_history(history: History) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Metadata to show: from the last summary, otherwise from the preview
    pub fn video(&self) -> Option<&VideoMetadata> {
        match &self.state {
            RequestState::Success(result) => result.video.as_ref(),
            RequestState::Failed(_) => None,
            _ => self.preview.as_ref(),
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match &self.state {
            RequestState::Success(result) => Some(result.summary.as_str()),
            _ => None,
        }
    }

    pub fn set_preview(&mut self, video: Option<VideoMetadata>) {
        self.preview = video;
    }

    /// Enter `Submitting`, refusing while another request is in flight
    pub fn begin(&mut self) -> Result<(), ClientError> {
        if self.state == RequestState::Submitting {
            return Err(ClientError::Busy);
        }
        self.state = RequestState::Submitting;
        Ok(())
    }

    /// Record the outcome of the in-flight request
    pub fn finish(&mut self, video_url: &str, outcome: Result<SummaryResult, ClientError>) {
        self.state = match outcome {
            Ok(result) => {
                self.history.push(HistoryEntry::new(video_url, &result.summary));
                self.preview = result.video.clone();
                RequestState::Success(result)
            }
            Err(e) => {
                self.preview = None;
                RequestState::Failed(e.to_string())
            }
        };
    }

    pub async fn submit(&mut self, backend: &BackendClient, video_url: &str) -> &RequestState {
        if let Err(e) = self.begin() {
            warn!("{e}");
            return &self.state;
        }
        let outcome = backend.summarize(video_url).await;
        self.finish(video_url, outcome);
        &self.state
    }
}
