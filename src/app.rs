use tracing::{debug, error, info, warn};

use crate::clipboard::{self, ClipboardProvider};
use crate::config::{Config, Paths};
use crate::constants::constants;
use crate::download::Downloader;
use crate::history::HistoryStore;
use crate::input::{
  EntryAction, ListCommand, MainChoice, PlaybackKey, Terminal, is_back, parse_list_command, parse_main_choice,
  resolve_index,
};
use crate::player::{InterruptHandle, PlayOptions, PlaybackState, Player};
use crate::ui;
use crate::youtube::{SearchResult, is_youtube_url, search_youtube};

/// Where control goes after a menu step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  Back,
  Quit,
}

/// Which list a selection sub-menu is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListView {
  Results,
  History,
}

/// Session context: owns the player, the invokers and the current result set.
pub struct App<T: Terminal> {
  term: T,
  helper: Vec<String>,
  quality: Option<u32>,
  player: Player,
  downloader: Downloader,
  history: HistoryStore,
  clipboard: Box<dyn ClipboardProvider + Send>,
  current_results: Vec<SearchResult>,
  read_failures: u32,
}

/// Consecutive unreadable lines tolerated before input is treated as closed.
const MAX_READ_FAILURES: u32 = 3;

impl<T: Terminal> App<T> {
  pub fn new(
    term: T,
    config: &Config,
    paths: &Paths,
    player: Player,
    history: HistoryStore,
    clipboard: Box<dyn ClipboardProvider + Send>,
  ) -> Self {
    Self {
      term,
      helper: config.helper.clone(),
      quality: config.default_quality,
      player,
      downloader: Downloader::new(config, paths),
      history,
      clipboard,
      current_results: Vec::new(),
      read_failures: 0,
    }
  }

  pub fn interrupt_handle(&self) -> InterruptHandle {
    self.player.interrupt_handle()
  }

  #[cfg(test)]
  pub fn player_state(&self) -> PlaybackState {
    self.player.state()
  }

  /// Main menu loop. Returns when the user exits or input ends.
  pub async fn run(&mut self) {
    loop {
      ui::main_menu();
      let Some(line) = self.read_line(ui::MAIN_PROMPT) else { break };
      let flow = match parse_main_choice(&line) {
        MainChoice::Search => self.search_menu().await,
        MainChoice::PlayUrl => self.url_menu().await,
        MainChoice::History => self.history_menu().await,
        MainChoice::Exit => Flow::Quit,
        MainChoice::Invalid => {
          ui::error("Invalid choice");
          Flow::Continue
        }
      };
      if flow == Flow::Quit {
        break;
      }
    }
    ui::success("Exiting...");
    self.shutdown().await;
  }

  /// Read one line. An unreadable line comes back empty so the menu rejects it;
  /// repeated failures end the session like end of input.
  fn read_line(&mut self, prompt: &str) -> Option<String> {
    match self.term.read_line(prompt) {
      Ok(line) => {
        self.read_failures = 0;
        line
      }
      Err(e) => {
        self.read_failures += 1;
        warn!(err = %e, failures = self.read_failures, "session: failed to read input");
        ui::error(&format!("Could not read input: {e}"));
        (self.read_failures < MAX_READ_FAILURES).then(String::new)
      }
    }
  }

  /// Stop any playback left running.
  pub async fn shutdown(&mut self) {
    if self.player.is_playing() {
      info!(url = ?self.player.current_url(), "session: stopping playback on exit");
    }
    if let Err(e) = self.player.stop().await {
      warn!(err = %e, "session: failed to stop player on exit");
    }
  }

  async fn search_menu(&mut self) -> Flow {
    loop {
      let Some(query) = self.read_line(ui::SEARCH_PROMPT) else { return Flow::Quit };
      if is_back(&query) {
        return Flow::Back;
      }
      if query.trim().eq_ignore_ascii_case("q") {
        return Flow::Quit;
      }
      if query.trim().is_empty() {
        ui::error("Enter a search term");
        continue;
      }

      match search_youtube(&self.helper, query.trim()).await {
        Ok(results) if results.is_empty() => {
          ui::error("No results found");
          continue;
        }
        Ok(results) => {
          debug!(ids = ?results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), "session: search results");
          self.current_results = results;
        }
        Err(e) => {
          error!(err = %e, query = %query, "session: search failed");
          ui::error(&e.to_string());
          continue;
        }
      }

      ui::search_results(&self.current_results);
      let urls = self.current_results.iter().map(|r| r.url.clone()).collect();
      if self.list_menu(ListView::Results, urls).await == Flow::Quit {
        return Flow::Quit;
      }
    }
  }

  async fn url_menu(&mut self) -> Flow {
    loop {
      let Some(url) = self.read_line(ui::URL_PROMPT) else { return Flow::Quit };
      let url = url.trim();
      if is_back(url) {
        return Flow::Back;
      }
      if url.eq_ignore_ascii_case("q") {
        return Flow::Quit;
      }
      if !is_youtube_url(url) {
        ui::error("Invalid YouTube URL");
        continue;
      }
      let url = url.to_string();
      if self.play(&url, self.play_options(false)).await == Flow::Quit {
        return Flow::Quit;
      }
    }
  }

  async fn history_menu(&mut self) -> Flow {
    let history = match self.history.load() {
      Ok(history) => history,
      Err(e) => {
        error!(err = %e, "session: failed to load history");
        ui::error(&format!("Failed to load history: {e}"));
        return Flow::Back;
      }
    };
    if history.watch_history.is_empty() {
      ui::warn("No history found");
      return Flow::Back;
    }
    let recent = history.recent(constants().history_view_size);
    ui::history_list(recent);
    let urls = recent.iter().map(|e| e.url.clone()).collect();
    self.list_menu(ListView::History, urls).await
  }

  /// Selection loop bound to the list the user was just shown. `urls` is a
  /// snapshot, so indices stay stable while history grows.
  async fn list_menu(&mut self, view: ListView, urls: Vec<String>) -> Flow {
    loop {
      let Some(line) = self.read_line(ui::LIST_PROMPT) else { return Flow::Quit };
      let (action, n) = match parse_list_command(&line) {
        ListCommand::Back => return Flow::Back,
        ListCommand::Quit => return Flow::Quit,
        ListCommand::Invalid => {
          ui::error("Invalid input");
          continue;
        }
        ListCommand::Entry(action, n) => (action, n),
      };
      let Some(idx) = resolve_index(n, urls.len()) else {
        ui::error(&format!("No entry {n}; choose 1-{}", urls.len()));
        continue;
      };
      let url = urls[idx].clone();
      debug!(?action, index = n, url = %url, "session: list action");

      match action {
        EntryAction::Play | EntryAction::PlayAudio => {
          let options = self.play_options(action == EntryAction::PlayAudio);
          if self.play(&url, options).await == Flow::Quit {
            return Flow::Quit;
          }
          if view == ListView::Results {
            ui::search_results(&self.current_results);
          }
        }
        EntryAction::Download => self.download(&url, self.play_options(false)).await,
        EntryAction::DownloadAudio => self.download(&url, self.play_options(true)).await,
        EntryAction::Copy => match clipboard::copy_with(self.clipboard.as_mut(), &url) {
          Ok(()) => ui::success("Copied to clipboard!"),
          Err(e) => {
            warn!(err = %e, "session: clipboard copy failed");
            ui::error(&e.to_string());
          }
        },
      }
    }
  }

  fn play_options(&self, audio_only: bool) -> PlayOptions {
    PlayOptions { audio_only, quality: self.quality }
  }

  /// Start playback, log it to history and block in the monitor loop.
  async fn play(&mut self, url: &str, options: PlayOptions) -> Flow {
    if let Err(e) = self.player.play(url, options).await {
      error!(err = %e, url = %url, "session: playback failed to start");
      ui::error(&e.to_string());
      return Flow::Continue;
    }
    if let Err(e) = self.history.record_watch(url) {
      warn!(err = %e, "session: failed to save history");
      ui::error(&format!("Failed to save history: {e}"));
    }
    ui::success("Playing media... (Press 'p' to pause, 'q' to stop)");
    self.monitor_playback().await
  }

  async fn monitor_playback(&mut self) -> Flow {
    if let Err(e) = self.term.begin_keys() {
      warn!(err = %e, "session: raw key input unavailable");
    }
    let flow = self.watch_player().await;
    if let Err(e) = self.term.end_keys() {
      warn!(err = %e, "session: failed to restore line input");
      ui::error(&format!("Could not restore terminal: {e}"));
    }
    flow
  }

  /// Alternate between an exit check and a short key poll until playback ends.
  async fn watch_player(&mut self) -> Flow {
    let interval = constants().poll_interval();
    loop {
      match self.player.poll_exit() {
        Ok(Some(status)) => {
          if !status.success() {
            ui::raw_status(&format!("Player exited with {status}"));
          }
          return Flow::Continue;
        }
        Ok(None) => {}
        Err(e) => {
          ui::raw_status(&e.to_string());
          self.stop_player().await;
          return Flow::Continue;
        }
      }

      let key = match self.term.poll_key(interval) {
        Ok(key) => key,
        Err(e) => {
          warn!(err = %e, "session: key input failed during playback");
          ui::raw_status(&format!("Key input failed: {e}"));
          self.stop_player().await;
          return Flow::Continue;
        }
      };
      match key {
        Some(PlaybackKey::TogglePause) => match self.player.toggle_pause().await {
          Ok(PlaybackState::Paused) => ui::raw_status("Paused playback"),
          Ok(PlaybackState::Playing) => ui::raw_status("Resumed playback"),
          Ok(PlaybackState::Idle) => ui::raw_status("Nothing is playing"),
          Err(e) => ui::raw_status(&format!("Pause error: {e}")),
        },
        Some(PlaybackKey::Stop) => {
          self.stop_player().await;
          return Flow::Continue;
        }
        Some(PlaybackKey::Interrupt) => {
          info!("session: interrupted during playback");
          self.stop_player().await;
          ui::raw_status("Application terminated by user");
          return Flow::Quit;
        }
        Some(PlaybackKey::Other) | None => {}
      }
    }
  }

  async fn stop_player(&mut self) {
    if let Err(e) = self.player.stop().await {
      ui::raw_status(&e.to_string());
    }
  }

  async fn download(&mut self, url: &str, options: PlayOptions) {
    ui::success(&format!("Downloading to {}...", self.downloader.target_dir(options).display()));
    match self.downloader.download(url, options).await {
      Ok(_) => ui::success("Download completed!"),
      Err(e) => ui::error(&e.to_string()),
    }
  }
}
