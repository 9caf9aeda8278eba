use anyhow::Result;
use ratatui::crossterm::{
  event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
  terminal,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;

// --- Menu Parsing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainChoice {
  Search,
  PlayUrl,
  History,
  Exit,
  Invalid,
}

pub fn parse_main_choice(input: &str) -> MainChoice {
  match input.trim() {
    "1" => MainChoice::Search,
    "2" => MainChoice::PlayUrl,
    "3" => MainChoice::History,
    "4" => MainChoice::Exit,
    _ => MainChoice::Invalid,
  }
}

/// What to do with an entry of a result or history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
  Play,
  PlayAudio,
  Download,
  DownloadAudio,
  Copy,
}

/// A parsed line from a result/history sub-menu. Indices are 1-based as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
  Entry(EntryAction, usize),
  Back,
  Quit,
  Invalid,
}

/// Parse `<n>`, `a<n>`, `d<n>`, `m<n>`, `c<n>`, `b` or `q` (case-insensitive).
pub fn parse_list_command(input: &str) -> ListCommand {
  let input = input.trim().to_lowercase();
  match input.as_str() {
    "b" => return ListCommand::Back,
    "q" => return ListCommand::Quit,
    _ => {}
  }
  let (action, digits) = match input.chars().next() {
    Some(c) if c.is_ascii_digit() => (EntryAction::Play, input.as_str()),
    Some('a') => (EntryAction::PlayAudio, &input[1..]),
    Some('d') => (EntryAction::Download, &input[1..]),
    Some('m') => (EntryAction::DownloadAudio, &input[1..]),
    Some('c') => (EntryAction::Copy, &input[1..]),
    _ => return ListCommand::Invalid,
  };
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return ListCommand::Invalid;
  }
  digits.parse().map_or(ListCommand::Invalid, |n| ListCommand::Entry(action, n))
}

/// Map a 1-based selection onto a list of `len` entries.
pub fn resolve_index(n: usize, len: usize) -> Option<usize> {
  (1..=len).contains(&n).then(|| n - 1)
}

/// `b` in a free-text prompt (search query, URL).
pub fn is_back(input: &str) -> bool {
  input.trim().eq_ignore_ascii_case("b")
}

/// Decode a raw stdin line. Invalid UTF-8 is replaced rather than rejected, so
/// stray bytes reach the menus as an unrecognised choice.
pub fn decode_line(raw: &[u8]) -> String {
  String::from_utf8_lossy(raw).trim().to_string()
}

// --- Playback Keys ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKey {
  TogglePause,
  Stop,
  /// Ctrl+C while raw mode swallows SIGINT.
  Interrupt,
  Other,
}

pub fn playback_key(key: KeyEvent) -> PlaybackKey {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    return PlaybackKey::Interrupt;
  }
  match key.code {
    KeyCode::Char('p') | KeyCode::Char('P') => PlaybackKey::TogglePause,
    KeyCode::Char('q') | KeyCode::Char('Q') => PlaybackKey::Stop,
    _ => PlaybackKey::Other,
  }
}

// --- Terminal ---

/// Where the session reads from: whole lines for menus, single keys during playback.
pub trait Terminal {
  /// Print `prompt` and read one line. `None` means end of input.
  fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
  /// Switch to key-at-a-time input.
  fn begin_keys(&mut self) -> Result<()>;
  fn end_keys(&mut self) -> Result<()>;
  /// Wait up to `timeout` for a key press.
  fn poll_key(&mut self, timeout: Duration) -> Result<Option<PlaybackKey>>;
}

/// Stdin for menus, crossterm raw mode for playback keys.
pub struct StdTerminal;

impl Terminal for StdTerminal {
  fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buf = Vec::new();
    if io::stdin().lock().read_until(b'\n', &mut buf)? == 0 {
      return Ok(None);
    }
    Ok(Some(decode_line(&buf)))
  }

  fn begin_keys(&mut self) -> Result<()> {
    terminal::enable_raw_mode()?;
    Ok(())
  }

  fn end_keys(&mut self) -> Result<()> {
    terminal::disable_raw_mode()?;
    Ok(())
  }

  fn poll_key(&mut self, timeout: Duration) -> Result<Option<PlaybackKey>> {
    if event::poll(timeout)?
      && let Event::Key(key) = event::read()?
      && key.kind == KeyEventKind::Press
    {
      return Ok(Some(playback_key(key)));
    }
    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- decode_line ---

  #[test]
  fn decode_line_trims_newline() {
    assert_eq!(decode_line(b" lofi beats \r\n"), "lofi beats");
  }

  #[test]
  fn decode_line_replaces_invalid_bytes() {
    let line = decode_line(b"\xff\xfe\n");
    assert_eq!(line, "\u{FFFD}\u{FFFD}");
    assert_eq!(parse_main_choice(&line), MainChoice::Invalid);
  }

  // --- parse_main_choice ---

  #[test]
  fn main_choices() {
    assert_eq!(parse_main_choice("1"), MainChoice::Search);
    assert_eq!(parse_main_choice(" 2 "), MainChoice::PlayUrl);
    assert_eq!(parse_main_choice("3"), MainChoice::History);
    assert_eq!(parse_main_choice("4"), MainChoice::Exit);
    assert_eq!(parse_main_choice("5"), MainChoice::Invalid);
    assert_eq!(parse_main_choice("xyz"), MainChoice::Invalid);
    assert_eq!(parse_main_choice(""), MainChoice::Invalid);
  }

  // --- parse_list_command ---

  #[test]
  fn list_play_and_download() {
    assert_eq!(parse_list_command("3"), ListCommand::Entry(EntryAction::Play, 3));
    assert_eq!(parse_list_command("d2"), ListCommand::Entry(EntryAction::Download, 2));
    assert_eq!(parse_list_command("D10"), ListCommand::Entry(EntryAction::Download, 10));
  }

  #[test]
  fn list_extra_actions() {
    assert_eq!(parse_list_command("a1"), ListCommand::Entry(EntryAction::PlayAudio, 1));
    assert_eq!(parse_list_command("m4"), ListCommand::Entry(EntryAction::DownloadAudio, 4));
    assert_eq!(parse_list_command("c5"), ListCommand::Entry(EntryAction::Copy, 5));
  }

  #[test]
  fn list_back_and_quit() {
    assert_eq!(parse_list_command("b"), ListCommand::Back);
    assert_eq!(parse_list_command(" B "), ListCommand::Back);
    assert_eq!(parse_list_command("q"), ListCommand::Quit);
  }

  #[test]
  fn list_invalid_inputs() {
    for input in ["xyz", "", "d", "d-1", "-1", "1.5", "d 2", "x3", "3d", "é", "99999999999999999999999"] {
      assert_eq!(parse_list_command(input), ListCommand::Invalid, "input {input:?}");
    }
  }

  // --- resolve_index ---

  #[test]
  fn resolve_index_bounds() {
    assert_eq!(resolve_index(1, 10), Some(0));
    assert_eq!(resolve_index(10, 10), Some(9));
    assert_eq!(resolve_index(0, 10), None);
    assert_eq!(resolve_index(11, 10), None);
    assert_eq!(resolve_index(1, 0), None);
  }

  #[test]
  fn back_detection() {
    assert!(is_back("b"));
    assert!(is_back(" B"));
    assert!(!is_back("bach"));
  }

  // --- playback_key ---

  #[test]
  fn playback_keys() {
    let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
    assert_eq!(playback_key(key(KeyCode::Char('p'))), PlaybackKey::TogglePause);
    assert_eq!(playback_key(key(KeyCode::Char('Q'))), PlaybackKey::Stop);
    assert_eq!(playback_key(key(KeyCode::Enter)), PlaybackKey::Other);
    assert_eq!(playback_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), PlaybackKey::Interrupt);
  }
}
