use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::{Error, Segment};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Auto-generated captions are only looked up in this language
pub const AUTO_CAPTION_LANG: &str = "en";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// `asr` for auto-generated tracks, absent for uploaded ones
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// One way of obtaining caption chunks for a video
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch caption chunks in playback order. Errors mean the source is unavailable.
    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>>;
}

/// Try each source in order and join the first non-empty set of chunks.
///
/// Every source is invoked at most once; there is no retry.
pub async fn fetch_transcript(sources: &[Arc<dyn TranscriptSource>], video_id: &str) -> Result<String, Error> {
    for source in sources {
        match source.fetch(video_id).await {
            Ok(chunks) if !chunks.is_empty() => {
                debug!("{} returned {} chunks for {video_id}", source.name(), chunks.len());
                return Ok(join_chunks(&chunks));
            }
            Ok(_) => info!("{} returned no captions for {video_id}", source.name()),
            Err(e) => info!("{} unavailable for {video_id}: {e}", source.name()),
        }
    }
    Err(Error::NoTranscript)
}

/// Join chunk texts with single spaces, dropping timing information
pub fn join_chunks(chunks: &[Segment]) -> String {
    chunks.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Owner captions first, then auto-generated English captions
pub fn default_sources(captions: CaptionClient, lang: &str) -> Vec<Arc<dyn TranscriptSource>> {
    vec![
        Arc::new(OwnerCaptions::new(captions.clone(), lang)),
        Arc::new(AutoCaptions::new(captions)),
    ]
}

/// Talks to YouTube's watch page, InnerTube player endpoint and timed-text tracks
#[derive(Debug, Clone)]
pub struct CaptionClient {
    client: reqwest::Client,
    base_url: String,
}

impl CaptionClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, YOUTUBE_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// List the caption tracks YouTube advertises for a video
    pub async fn caption_tracks(&self, video_id: &str, lang: &str) -> Result<Vec<CaptionTrack>> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch?v={video_id}", self.base_url);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{}/youtubei/v1/player?key={api_key}&prettyPrint=false", self.base_url);

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default())
    }

    /// Download and parse one caption track
    pub async fn download(&self, track: &CaptionTrack) -> Result<Vec<Segment>> {
        debug!("Using caption track: lang={} kind={:?}", track.language_code, track.kind);

        let caption_xml = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

/// Captions uploaded by the video owner
pub struct OwnerCaptions {
    captions: CaptionClient,
    lang: String,
}

impl OwnerCaptions {
    pub fn new(captions: CaptionClient, lang: &str) -> Self {
        Self {
            captions,
            lang: lang.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptSource for OwnerCaptions {
    fn name(&self) -> &str {
        "owner captions"
    }

    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>> {
        let tracks = self.captions.caption_tracks(video_id, &self.lang).await?;
        let Some(track) = select_owner_track(&tracks, &self.lang) else {
            bail!("no owner captions uploaded for video {video_id}");
        };
        self.captions.download(track).await
    }
}

/// Captions YouTube generated by speech recognition
pub struct AutoCaptions {
    captions: CaptionClient,
}

impl AutoCaptions {
    pub fn new(captions: CaptionClient) -> Self {
        Self { captions }
    }
}

#[async_trait]
impl TranscriptSource for AutoCaptions {
    fn name(&self) -> &str {
        "auto-generated captions"
    }

    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>> {
        let tracks = self.captions.caption_tracks(video_id, AUTO_CAPTION_LANG).await?;
        let Some(track) = select_auto_track(&tracks, AUTO_CAPTION_LANG) else {
            bail!("no auto-generated {AUTO_CAPTION_LANG} captions for video {video_id}");
        };
        self.captions.download(track).await
    }
}

/// Prefer an uploaded track in `lang`, otherwise the first uploaded track
pub fn select_owner_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    let mut owner = tracks.iter().filter(|t| !t.is_auto_generated());
    let first = owner.clone().next();
    owner.find(|t| t.language_code == lang).or(first)
}

pub fn select_auto_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_auto_generated() && t.language_code == lang)
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = 0.0;
                let mut dur = 0.0;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                    match attr.key.as_ref() {
                        b"start" => start = value.unwrap_or_default(),
                        b"dur" => dur = value.unwrap_or_default(),
                        _ => {}
                    }
                }
                current = Some((start, dur));
            }
            Ok(Event::Text(ref e)) => {
                if let Some((start, duration)) = current.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.is_empty() {
                        segments.push(Segment { text, start, duration });
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => current = None,
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}
