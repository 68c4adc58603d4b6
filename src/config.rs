use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::summarize::{DEFAULT_MAX_TRANSCRIPT_CHARS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_CAPTION_LANG: &str = "en";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4000";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_transcript_chars: Option<usize>,
    pub caption_lang: Option<String>,
    pub server_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/tldv/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// `PORT` from the environment wins over the file
    pub fn port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .or(self.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_transcript_chars(&self) -> usize {
        self.max_transcript_chars.unwrap_or(DEFAULT_MAX_TRANSCRIPT_CHARS)
    }

    pub fn caption_lang(&self) -> &str {
        self.caption_lang.as_deref().unwrap_or(DEFAULT_CAPTION_LANG)
    }

    /// `TLDV_SERVER` from the environment wins over the file
    pub fn server_url(&self) -> String {
        std::env::var("TLDV_SERVER")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }
}

/// Read an API key from the environment, treating empty values as unset
pub fn api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("tldv")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
host = "127.0.0.1"
port = 8080
model = "claude-sonnet-4-6"
temperature = 0.2
max_transcript_chars = 20000
caption_lang = "es"
server_url = "http://tldv.local:8080"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.model(), "claude-sonnet-4-6");
        assert!((config.temperature() - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_transcript_chars(), 20000);
        assert_eq!(config.caption_lang(), "es");
        assert_eq!(config.server_url.as_deref(), Some("http://tldv.local:8080"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.model(), "gpt-4-turbo");
        assert_eq!(config.max_transcript_chars(), DEFAULT_MAX_TRANSCRIPT_CHARS);
        assert_eq!(config.caption_lang(), "en");
        assert!((config.temperature() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"model = "gpt-4o""#).unwrap();
        assert_eq!(config.model(), "gpt-4o");
        assert!(config.port.is_none());
    }
}
