mod app;
mod clipboard;
mod config;
mod constants;
mod deps;
mod download;
mod error;
mod history;
mod input;
mod player;
mod ui;
mod youtube;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use app::App;
use clipboard::SystemClipboard;
use config::Config;
use history::HistoryStore;
use input::StdTerminal;
use player::{InterruptHandle, Player};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Config file (default: platform config dir, e.g. ~/.config/termtube/config.toml)
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Skip the startup check for mpv, yt-dlp and ffmpeg
  #[arg(long)]
  skip_deps: bool,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a daily file in `log_dir`; stdout belongs to the menus.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("termtube")
    .filename_suffix("log")
    .build(log_dir)
    .with_context(|| format!("Failed to open log directory {}", log_dir.display()))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("termtube=info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Ok(guard)
}

// --- Signals ---

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
  use tokio::signal::unix::{SignalKind, signal};
  let mut terminate = signal(SignalKind::terminate())?;
  tokio::select! {
    result = tokio::signal::ctrl_c() => result,
    _ = terminate.recv() => Ok(()),
  }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
  tokio::signal::ctrl_c().await
}

/// Kill the live player and exit on SIGINT/SIGTERM. Downloads in flight are abandoned.
fn spawn_interrupt_handler(handle: InterruptHandle) {
  tokio::spawn(async move {
    if let Err(e) = shutdown_signal().await {
      error!(err = %e, "signals: failed to install handler");
      return;
    }
    info!(pid = ?handle.pid(), "signals: interrupted");
    handle.terminate();
    let _ = ratatui::crossterm::terminal::disable_raw_mode();
    println!();
    ui::warn("Application terminated by user");
    std::process::exit(0);
  });
}

// --- Main ---

#[tokio::main]
async fn main() -> ExitCode {
  let args = Args::parse();

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = ratatui::crossterm::terminal::disable_raw_mode();
    default_hook(info);
  }));

  match run(args).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!(err = %format!("{e:#}"), "fatal startup error");
      ui::error(&format!("Fatal error: {e:#}"));
      ExitCode::FAILURE
    }
  }
}

async fn run(args: Args) -> Result<()> {
  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
    return Ok(());
  }

  let config = Config::load(args.config.as_deref())?;
  let paths = config.paths();
  paths.create_dirs()?;
  let _log_guard = init_logging(&paths.log_dir)?;
  info!(version = env!("CARGO_PKG_VERSION"), ?paths, "starting");

  ui::clear_screen();
  ui::banner();

  if !args.skip_deps {
    ui::info("Checking dependencies...");
    deps::ensure(&config).await.context("Dependency check failed")?;
    ui::success("All dependencies are satisfied!");
  }

  let history = HistoryStore::new(&paths.history_file);
  history.ensure_exists().with_context(|| format!("Failed to create {}", history.path().display()))?;

  let player = Player::new(config.player.clone());
  let mut app = App::new(StdTerminal, &config, &paths, player, history, Box::new(SystemClipboard));
  spawn_interrupt_handler(app.interrupt_handle());

  app.run().await;
  Ok(())
}
