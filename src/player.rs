use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tracing::{info, warn};

use crate::config::{command, program_name};
use crate::constants::constants;
use crate::error::{Error, Result, spawn_message};
use crate::youtube::quality_selector;

/// mpv JSON IPC command that flips the pause property.
const CYCLE_PAUSE: &[u8] = b"{\"command\":[\"cycle\",\"pause\"]}\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
  Idle,
  Playing,
  Paused,
}

/// Options shared by playback and download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayOptions {
  pub audio_only: bool,
  /// Maximum video height, e.g. 720.
  pub quality: Option<u32>,
}

/// Shareable view of the live player pid, used by the signal handler.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicU32>);

impl InterruptHandle {
  fn set(&self, pid: Option<u32>) {
    self.0.store(pid.unwrap_or(0), Ordering::SeqCst);
  }

  pub fn pid(&self) -> Option<u32> {
    Some(self.0.load(Ordering::SeqCst)).filter(|&pid| pid != 0)
  }

  /// Ask the live player, if any, to terminate. Safe to call from any thread.
  pub fn terminate(&self) {
    let pid = self.0.swap(0, Ordering::SeqCst);
    if pid != 0 {
      signal_terminate(pid);
    }
  }
}

#[cfg(unix)]
fn signal_terminate(pid: u32) {
  // SAFETY: plain syscall on a pid we spawned; a stale pid only yields ESRCH.
  unsafe {
    libc::kill(pid as libc::pid_t, libc::SIGTERM);
  }
}

/// No signals on Windows; `taskkill /T /F` also takes down mpv's helper children.
#[cfg(windows)]
fn signal_terminate(pid: u32) {
  let _ = std::process::Command::new("taskkill")
    .args(["/PID", &pid.to_string(), "/T", "/F"])
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .status();
}

#[cfg(not(any(unix, windows)))]
fn signal_terminate(_pid: u32) {}

/// Owns at most one player process and its control channel.
pub struct Player {
  argv: Vec<String>,
  current_process: Option<Child>,
  current_url: Option<String>,
  state: PlaybackState,
  ipc_socket_path: PathBuf,
  interrupt: InterruptHandle,
}

fn default_socket_path() -> PathBuf {
  let name = format!("{}-{}", constants().ipc_socket_prefix, std::process::id());
  if cfg!(windows) { PathBuf::from(format!(r"\\.\pipe\{name}")) } else { std::env::temp_dir().join(format!("{name}.sock")) }
}

impl Player {
  pub fn new(argv: Vec<String>) -> Self {
    Self::with_socket_path(argv, default_socket_path())
  }

  pub fn with_socket_path(argv: Vec<String>, ipc_socket_path: PathBuf) -> Self {
    Self {
      argv,
      current_process: None,
      current_url: None,
      state: PlaybackState::Idle,
      ipc_socket_path,
      interrupt: InterruptHandle::default(),
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> PlaybackState {
    self.state
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  pub fn current_url(&self) -> Option<&str> {
    self.current_url.as_deref()
  }

  #[cfg(test)]
  pub fn pid(&self) -> Option<u32> {
    self.current_process.as_ref().and_then(Child::id)
  }

  #[cfg(test)]
  pub fn ipc_socket_path(&self) -> &Path {
    &self.ipc_socket_path
  }

  pub fn interrupt_handle(&self) -> InterruptHandle {
    self.interrupt.clone()
  }

  /// Player flags for `url`; the argv prefix is prepended by the caller.
  pub fn build_args(&self, url: &str, options: PlayOptions) -> Result<Vec<String>> {
    let socket = self
      .ipc_socket_path
      .to_str()
      .ok_or_else(|| Error::PlaybackError("control socket path is not valid UTF-8".into()))?;
    let mut args = vec!["--no-terminal".to_string(), format!("--input-ipc-server={socket}")];
    if options.audio_only {
      args.push("--no-video".to_string());
    }
    match options.quality {
      Some(height) => args.push(format!("--ytdl-format={}", quality_selector(height))),
      None => args.push("--ytdl-format=best".to_string()),
    }
    args.push(url.to_string());
    Ok(args)
  }

  /// Start playing `url`, replacing any running session.
  pub async fn play(&mut self, url: &str, options: PlayOptions) -> Result<()> {
    self.stop().await?;
    let args = self.build_args(url, options)?;

    // Remove stale socket if it exists from a previous crash.
    #[cfg(unix)]
    let _ = std::fs::remove_file(&self.ipc_socket_path);

    let child = command(&self.argv)
      .args(&args)
      .stdin(Stdio::null())
      // mpv writes nothing useful with --no-terminal; keep the menu clean.
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| Error::PlaybackError(spawn_message(program_name(&self.argv), &e)))?;

    info!(url = %url, pid = ?child.id(), audio_only = options.audio_only, quality = ?options.quality, "playback: started");
    self.interrupt.set(child.id());
    self.current_process = Some(child);
    self.current_url = Some(url.to_string());
    self.state = PlaybackState::Playing;
    Ok(())
  }

  /// Flip between Playing and Paused. Returns the new state; `Idle` means
  /// nothing was playing and no command was sent.
  pub async fn toggle_pause(&mut self) -> Result<PlaybackState> {
    let next = match self.state {
      PlaybackState::Idle => {
        warn!("playback: pause requested with nothing playing");
        return Ok(PlaybackState::Idle);
      }
      PlaybackState::Playing => PlaybackState::Paused,
      PlaybackState::Paused => PlaybackState::Playing,
    };
    send_command(&self.ipc_socket_path, CYCLE_PAUSE).await?;
    self.state = next;
    info!(state = ?next, "playback: pause toggled");
    Ok(next)
  }

  /// Non-blocking exit check. Transitions to Idle once the player has exited.
  pub fn poll_exit(&mut self) -> Result<Option<ExitStatus>> {
    let Some(child) = self.current_process.as_mut() else {
      return Ok(None);
    };
    match child.try_wait()? {
      Some(status) => {
        info!(%status, "playback: player exited");
        self.current_process = None;
        self.reset();
        Ok(Some(status))
      }
      None => Ok(None),
    }
  }

  /// Kill the active player, if any. Idempotent.
  pub async fn stop(&mut self) -> Result<()> {
    if let Some(mut child) = self.current_process.take() {
      if let Err(e) = child.kill().await
        && child.try_wait().ok().flatten().is_none()
      {
        self.reset();
        return Err(Error::PlaybackError(format!("failed to stop player: {e}")));
      }
      info!("playback: stopped");
    }
    self.reset();
    Ok(())
  }

  fn reset(&mut self) {
    self.interrupt.set(None);
    self.current_url = None;
    self.state = PlaybackState::Idle;
    #[cfg(unix)]
    let _ = std::fs::remove_file(&self.ipc_socket_path);
  }
}

#[cfg(unix)]
async fn send_command(path: &Path, cmd: &[u8]) -> Result<()> {
  let mut stream = tokio::net::UnixStream::connect(path)
    .await
    .map_err(|e| Error::PlaybackError(format!("failed to connect to player control socket: {e}")))?;
  stream.write_all(cmd).await.map_err(|e| Error::PlaybackError(format!("failed to send player command: {e}")))?;
  Ok(())
}

#[cfg(windows)]
async fn send_command(path: &Path, cmd: &[u8]) -> Result<()> {
  use tokio::net::windows::named_pipe::ClientOptions;
  let mut pipe = ClientOptions::new()
    .open(path)
    .map_err(|e| Error::PlaybackError(format!("failed to open player control pipe: {e}")))?;
  pipe.write_all(cmd).await.map_err(|e| Error::PlaybackError(format!("failed to send player command: {e}")))?;
  Ok(())
}
