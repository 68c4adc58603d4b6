use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, error};

use crate::Error;

/// Instructions sent with every transcript. Clients render the reply as plain
/// text and expect this shape.
pub const SYSTEM_PROMPT: &str = "You summarize YouTube transcripts. \
Start with a short overview of the video, then list the key points as bullet points, \
then close with the key takeaways. Use • or - for bullet points. \
Add timestamps like [00:01:15] when the transcript contains them, otherwise skip them. \
Keep the summary clear and easy to read.";

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Characters of transcript sent to the model; the rest is cut off
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 100_000;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Turns transcript text into a summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else {
            Provider::OpenAi
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
        }
    }
}

/// Summarizer backed by a hosted chat model
#[derive(Debug, Clone)]
pub struct LlmSummarizer {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
    temperature: f32,
    max_chars: usize,
}

impl LlmSummarizer {
    pub fn new(client: reqwest::Client, model: &str, api_key: &str) -> Self {
        let provider = Provider::for_model(model);
        Self {
            client,
            provider,
            model: model.to_string(),
            api_key: api_key.to_string(),
            base_url: provider.default_base_url().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn summarize_openai(&self, user_message: &str) -> Result<Response> {
        debug!("Summarizing via OpenAI API with model {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": user_message
                }
            ],
            "temperature": self.temperature
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        Response::read(resp, extract_openai_text).await
    }

    async fn summarize_anthropic(&self, user_message: &str) -> Result<Response> {
        debug!("Summarizing via Anthropic API with model {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "system": SYSTEM_PROMPT,
            "temperature": self.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": user_message
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        Response::read(resp, extract_anthropic_text).await
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, Error> {
        let transcript = truncate_transcript(transcript, self.max_chars);
        let user_message = format!("Here is the transcript:\n\n{transcript}");

        let outcome = match self.provider {
            Provider::OpenAi => self.summarize_openai(&user_message).await,
            Provider::Anthropic => self.summarize_anthropic(&user_message).await,
        };

        match outcome {
            Ok(Response::Text(text)) => Ok(text),
            Ok(Response::Rejected { status, body }) => {
                error!("{:?} API returned {status}: {body}", self.provider);
                Err(classify_rejection(&body))
            }
            Err(e) => {
                error!("{:?} request failed: {e}", self.provider);
                Err(Error::SummarizationFailed)
            }
        }
    }
}

/// What a provider answered, before classification
enum Response {
    Text(String),
    Rejected { status: reqwest::StatusCode, body: String },
}

impl Response {
    async fn read(resp: reqwest::Response, extract: fn(&serde_json::Value) -> Result<String>) -> Result<Self> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Ok(Response::Rejected { status, body });
        }

        let json: serde_json::Value = resp.json().await?;
        Ok(Response::Text(extract(&json)?))
    }
}

/// Cut the transcript to at most `max_chars` characters
pub fn truncate_transcript(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Map a provider error body onto the user-facing taxonomy
fn classify_rejection(body: &str) -> Error {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return Error::SummarizationFailed;
    };
    let Some(err) = json.get("error") else {
        return Error::SummarizationFailed;
    };

    // OpenAI
    if err.get("code").and_then(|c| c.as_str()) == Some("context_length_exceeded") {
        return Error::ContextTooLong;
    }

    // Anthropic
    let message = err.get("message").and_then(|m| m.as_str()).unwrap_or_default();
    if err.get("type").and_then(|t| t.as_str()) == Some("invalid_request_error")
        && message.to_lowercase().contains("too long")
    {
        return Error::ContextTooLong;
    }

    Error::SummarizationFailed
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Anthropic API response format");
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}
