use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the session loop.
///
/// Every variant is recoverable at the menu level except `DependencyMissing`
/// after a failed install attempt, which `main` turns into exit code 1.
#[derive(Debug, Error)]
pub enum Error {
  #[error("missing dependencies: {}", .0.join(", "))]
  DependencyMissing(Vec<String>),

  #[error("search failed: {0}")]
  SearchFailed(String),

  #[error("playback error: {0}")]
  PlaybackError(String),

  #[error("download failed: {0}")]
  DownloadFailed(String),

  #[error("history file {} is corrupt: {source}", .path.display())]
  CorruptHistory {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("clipboard error: {0}")]
  ClipboardError(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map a spawn failure to a readable message, calling out a missing executable.
pub(crate) fn spawn_message(program: &str, err: &std::io::Error) -> String {
  if err.kind() == std::io::ErrorKind::NotFound {
    format!("{program} not found. Install it with: pkg install {program} (Termux) or your package manager")
  } else {
    format!("failed to run {program}: {err}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dependency_missing_lists_programs() {
    let err = Error::DependencyMissing(vec!["mpv".into(), "ffmpeg".into()]);
    assert_eq!(err.to_string(), "missing dependencies: mpv, ffmpeg");
  }

  #[test]
  fn spawn_message_not_found() {
    let err = std::io::Error::from(std::io::ErrorKind::NotFound);
    assert!(spawn_message("mpv", &err).starts_with("mpv not found"));
  }

  #[test]
  fn spawn_message_other() {
    let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
    assert!(spawn_message("yt-dlp", &err).starts_with("failed to run yt-dlp"));
  }
}
