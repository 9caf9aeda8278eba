use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{info, warn};

use crate::config::{Config, Paths, command, program_name};
use crate::error::{Error, Result, spawn_message};
use crate::player::PlayOptions;
use crate::youtube::quality_selector;

/// Runs yt-dlp to save media into the video or audio directory.
#[derive(Debug, Clone)]
pub struct Downloader {
  helper: Vec<String>,
  video_dir: PathBuf,
  audio_dir: PathBuf,
  audio_format: String,
}

impl Downloader {
  pub fn new(config: &Config, paths: &Paths) -> Self {
    Self {
      helper: config.helper.clone(),
      video_dir: paths.video_dir.clone(),
      audio_dir: paths.audio_dir.clone(),
      audio_format: config.audio_format.clone(),
    }
  }

  pub fn target_dir(&self, options: PlayOptions) -> &Path {
    if options.audio_only { &self.audio_dir } else { &self.video_dir }
  }

  /// yt-dlp arguments: format selection, output template, then the URL.
  pub fn build_args(&self, url: &str, options: PlayOptions) -> Vec<String> {
    let mut args = Vec::new();
    if options.audio_only {
      args.extend(["-x".to_string(), "--audio-format".to_string(), self.audio_format.clone()]);
    } else if let Some(height) = options.quality {
      args.extend(["-f".to_string(), quality_selector(height)]);
    }
    let template = self.target_dir(options).join("%(title)s.%(ext)s");
    args.extend(["-o".to_string(), template.to_string_lossy().into_owned(), "--".to_string(), url.to_string()]);
    args
  }

  /// Download `url` and block until the helper exits. Returns the target directory.
  pub async fn download(&self, url: &str, options: PlayOptions) -> Result<PathBuf> {
    let dir = self.target_dir(options).to_path_buf();
    info!(url = %url, dir = %dir.display(), audio_only = options.audio_only, quality = ?options.quality, "download: starting");

    // Progress goes straight to the terminal.
    let status = command(&self.helper)
      .args(self.build_args(url, options))
      .stdin(Stdio::null())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()
      .await
      .map_err(|e| Error::DownloadFailed(spawn_message(program_name(&self.helper), &e)))?;

    if !status.success() {
      warn!(url = %url, %status, "download: helper failed");
      return Err(Error::DownloadFailed(format!("{} exited with {}", program_name(&self.helper), status)));
    }
    info!(url = %url, "download: completed");
    Ok(dir)
  }
}
