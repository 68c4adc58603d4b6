use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Number of summaries kept; older ones are dropped
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_url: String,
    pub summary: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn new(video_url: &str, summary: &str) -> Self {
        Self {
            video_url: video_url.to_string(),
            summary: summary.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// e.g. `Mar 4, 2025 – 09:07` in local time
    pub fn formatted_timestamp(&self) -> String {
        match Local.timestamp_millis_opt(self.timestamp).single() {
            Some(dt) => dt.format("%b %-d, %Y – %H:%M").to_string(),
            None => self.timestamp.to_string(),
        }
    }
}

/// Most-recent-first list of past summaries, never longer than its capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut history = Self::default();
        history.entries.extend(entries.into_iter().take(history.capacity));
        history
    }

    /// Add the newest entry, dropping the oldest once full
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// JSON file holding the history between runs
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::at(history_path())
    }
}

impl HistoryStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file is an empty history
    pub fn load(&self) -> History {
        let Ok(data) = std::fs::read_to_string(&self.path) else {
            return History::default();
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&data) {
            Ok(entries) => History::from_entries(entries),
            Err(e) => {
                debug!("Ignoring unreadable history {}: {e}", self.path.display());
                History::default()
            }
        }
    }

    pub fn save(&self, history: &History) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries: Vec<&HistoryEntry> = history.entries().collect();
        std::fs::write(&self.path, serde_json::to_string(&entries)?)?;
        debug!("Saved {} history entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Load, push and save in one step
    pub fn record(&self, entry: HistoryEntry) -> Result<History> {
        let mut history = self.load();
        history.push(entry);
        self.save(&history)?;
        Ok(history)
    }
}

pub fn history_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tldv")
        .join("history.json")
}
