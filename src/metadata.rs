use async_trait::async_trait;
use eyre::Result;
use log::{debug, warn};
use serde::Deserialize;

use crate::{Error, VideoMetadata};

pub const OEMBED_URL: &str = "https://www.youtube.com/oembed";
pub const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Looks up display metadata for a video
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fails with [`Error::MetadataUnavailable`] only; callers decide whether that matters.
    async fn fetch(&self, video_id: &str) -> Result<VideoMetadata, Error>;
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
    author_name: String,
    thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

/// oEmbed for title, author and thumbnail, plus the Data API for duration when keyed
#[derive(Debug, Clone)]
pub struct YoutubeMetadata {
    client: reqwest::Client,
    oembed_url: String,
    data_api_url: String,
    api_key: Option<String>,
}

impl YoutubeMetadata {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_endpoints(client, api_key, OEMBED_URL, DATA_API_URL)
    }

    pub fn with_endpoints(client: reqwest::Client, api_key: Option<String>, oembed_url: &str, data_api_url: &str) -> Self {
        Self {
            client,
            oembed_url: oembed_url.to_string(),
            data_api_url: data_api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    async fn oembed(&self, video_id: &str) -> Result<VideoMetadata> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let resp: OembedResponse = self
            .client
            .get(&self.oembed_url)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(VideoMetadata {
            title: resp.title,
            thumbnail: resp.thumbnail_url,
            author: resp.author_name,
            duration: None,
        })
    }

    async fn duration(&self, video_id: &str, api_key: &str) -> Result<Option<String>> {
        let resp: VideoListResponse = self
            .client
            .get(format!("{}/videos", self.data_api_url))
            .query(&[("part", "contentDetails"), ("id", video_id), ("key", api_key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.duration)
            .filter(|d| !d.is_empty()))
    }
}

#[async_trait]
impl MetadataSource for YoutubeMetadata {
    async fn fetch(&self, video_id: &str) -> Result<VideoMetadata, Error> {
        let mut meta = self.oembed(video_id).await.map_err(|e| {
            warn!("Metadata fetch failed for {video_id}: {e}");
            Error::MetadataUnavailable
        })?;

        if let Some(api_key) = &self.api_key {
            match self.duration(video_id, api_key).await {
                Ok(duration) => meta.duration = duration,
                Err(e) => debug!("Duration lookup failed for {video_id}: {e}"),
            }
        }

        Ok(meta)
    }
}
