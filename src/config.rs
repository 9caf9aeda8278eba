use anyhow::{Context, Result, bail};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::constants::constants;

/// User preferences read from `config.toml`. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
  /// Player argv prefix; the player flags and URL are appended.
  pub player: Vec<String>,
  /// yt-dlp argv prefix, used for both search and download.
  pub helper: Vec<String>,
  pub video_dir: Option<PathBuf>,
  pub audio_dir: Option<PathBuf>,
  pub history_file: PathBuf,
  pub log_dir: PathBuf,
  /// Height ceiling applied to `d<n>` downloads and regular playback.
  pub default_quality: Option<u32>,
  pub audio_format: String,
  /// Package manager invocation used to install missing programs.
  pub install_command: Vec<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      player: vec!["mpv".to_string()],
      helper: vec!["yt-dlp".to_string()],
      video_dir: None,
      audio_dir: None,
      history_file: PathBuf::from("config").join("history.json"),
      log_dir: PathBuf::from("logs"),
      default_quality: None,
      audio_format: constants().audio_format.clone(),
      install_command: default_install_command(),
    }
  }
}

/// Resolved on-disk locations.
#[derive(Debug, Clone)]
pub struct Paths {
  pub video_dir: PathBuf,
  pub audio_dir: PathBuf,
  pub history_file: PathBuf,
  pub log_dir: PathBuf,
}

impl Paths {
  /// Create every directory the session writes into.
  pub fn create_dirs(&self) -> Result<()> {
    let history_parent = self.history_file.parent().filter(|p| !p.as_os_str().is_empty());
    let dirs = [Some(self.video_dir.as_path()), Some(self.audio_dir.as_path()), Some(self.log_dir.as_path()), history_parent];
    for dir in dirs.into_iter().flatten() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
  }
}

impl Config {
  /// Default config file location, e.g. `~/.config/termtube/config.toml`.
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "termtube").map(|dirs| dirs.config_dir().join("config.toml"))
  }

  /// Load from `path`, or the default location. A missing file yields defaults;
  /// a malformed one is an error.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => match Self::default_path() {
        Some(p) => p,
        None => return Ok(Self::default()),
      },
    };
    match std::fs::read_to_string(&path) {
      Ok(content) => Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(e) => Err(e).with_context(|| format!("Failed to read config file {}", path.display())),
    }
  }

  pub fn parse(content: &str) -> Result<Self> {
    let config: Config = toml::from_str(content)?;
    if config.player.is_empty() {
      bail!("`player` must name a program");
    }
    if config.helper.is_empty() {
      bail!("`helper` must name a program");
    }
    Ok(config)
  }

  pub fn paths(&self) -> Paths {
    let c = constants();
    let downloads = downloads_dir();
    Paths {
      video_dir: self.video_dir.clone().unwrap_or_else(|| downloads.join(&c.video_subdir)),
      audio_dir: self.audio_dir.clone().unwrap_or_else(|| downloads.join(&c.audio_subdir)),
      history_file: self.history_file.clone(),
      log_dir: self.log_dir.clone(),
    }
  }
}

/// Termux shared storage when present, else the platform Downloads folder.
fn downloads_dir() -> PathBuf {
  let termux = PathBuf::from(&constants().termux_download_dir);
  if termux.is_dir() {
    return termux;
  }
  UserDirs::new()
    .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
    .or_else(|| UserDirs::new().map(|dirs| dirs.home_dir().join("Downloads")))
    .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn is_termux() -> bool {
  std::env::var("PREFIX").is_ok_and(|p| p.contains("com.termux"))
}

fn default_install_command() -> Vec<String> {
  if is_termux() { vec!["pkg".to_string(), "install".to_string(), "-y".to_string()] } else { Vec::new() }
}

/// Build a command from an argv prefix such as `["mpv"]` or `["sh", "-c", "..."]`.
///
/// Callers guarantee a non-empty prefix (`Config::parse` rejects empty ones).
pub fn command(argv: &[String]) -> Command {
  let (program, rest) = argv.split_first().map_or(("", &[][..]), |(p, r)| (p.as_str(), r));
  let mut cmd = Command::new(program);
  cmd.args(rest);
  cmd
}

/// Display name of an argv prefix, used in messages.
pub fn program_name(argv: &[String]) -> &str {
  argv.first().map_or("", String::as_str)
}
