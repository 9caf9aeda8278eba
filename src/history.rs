use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::constants;
use crate::error::{Error, Result};

/// One watched URL and when playback started (`YYYY-MM-DD HH:MM:SS`, local time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub url: String,
  pub timestamp: String,
}

/// On-disk shape of the history file. Both keys are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFile {
  /// Preserved across writes; nothing appends to it yet.
  pub search_history: Vec<String>,
  /// Most recent first, capped at `history_capacity`.
  pub watch_history: Vec<HistoryEntry>,
}

impl HistoryFile {
  /// Insert at the head and drop the oldest entries beyond `capacity`.
  pub fn push_watch(&mut self, entry: HistoryEntry, capacity: usize) {
    self.watch_history.insert(0, entry);
    self.watch_history.truncate(capacity);
  }

  /// The slice shown by the history menu.
  pub fn recent(&self, limit: usize) -> &[HistoryEntry] {
    &self.watch_history[..self.watch_history.len().min(limit)]
  }
}

/// JSON-backed watch log. Every write is a whole-file read-modify-write.
#[derive(Debug, Clone)]
pub struct HistoryStore {
  path: PathBuf,
}

impl HistoryStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Create the file with empty sequences if it does not exist yet.
  pub fn ensure_exists(&self) -> Result<()> {
    if self.path.exists() {
      return Ok(());
    }
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    info!(path = %self.path.display(), "history: creating empty history file");
    self.save(&HistoryFile::default())
  }

  pub fn load(&self) -> Result<HistoryFile> {
    let content = std::fs::read_to_string(&self.path)?;
    serde_json::from_str(&content).map_err(|source| Error::CorruptHistory { path: self.path.clone(), source })
  }

  /// Write through a sibling temp file and rename it into place.
  pub fn save(&self, history: &HistoryFile) -> Result<()> {
    let json = serde_json::to_string_pretty(history)
      .map_err(|source| Error::CorruptHistory { path: self.path.clone(), source })?;
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &self.path)?;
    Ok(())
  }

  pub fn record_watch(&self, url: &str) -> Result<HistoryEntry> {
    self.record_watch_at(url, Local::now())
  }

  pub fn record_watch_at(&self, url: &str, at: DateTime<Local>) -> Result<HistoryEntry> {
    let c = constants();
    let mut history = self.load()?;
    let entry = HistoryEntry { url: url.to_string(), timestamp: at.format(&c.timestamp_format).to_string() };
    history.push_watch(entry.clone(), c.history_capacity);
    self.save(&history)?;
    debug!(url = %url, entries = history.watch_history.len(), "history: recorded watch");
    Ok(entry)
  }
}
