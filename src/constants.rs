//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // yt-dlp search
  pub search_results: usize,

  // History
  pub history_capacity: usize,
  pub history_view_size: usize,
  pub timestamp_format: String,

  // Playback
  pub poll_interval_ms: u64,
  pub ipc_socket_prefix: String,

  // Downloads
  pub audio_format: String,
  pub video_subdir: String,
  pub audio_subdir: String,
  pub termux_download_dir: String,

  // Dependency bootstrap
  pub required_programs: Vec<String>,
}

impl Constants {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
