use ratatui::crossterm::{
  cursor::MoveTo,
  execute,
  style::Stylize,
  terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::history::HistoryEntry;
use crate::youtube::SearchResult;

/// Longest title shown in a result row before truncation (display columns).
const TITLE_WIDTH: usize = 72;

pub const MAIN_PROMPT: &str = "\nSelect option (1-4): ";
pub const SEARCH_PROMPT: &str = "\nEnter search query ('b' to go back, 'q' to quit): ";
pub const URL_PROMPT: &str = "\nEnter YouTube URL ('b' to go back, 'q' to quit): ";
pub const LIST_PROMPT: &str =
  "\nEnter number to play, 'a<n>' audio only, 'd<n>' download, 'm<n>' download audio, 'c<n>' copy URL, 'b' back: ";

// --- Helpers ---

/// Truncate to `max_width` display columns, appending "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
  let mut width = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if width + w > max_width {
      // Back off far enough for the ellipsis.
      while width + 1 > max_width {
        let Some(last) = out.pop() else { break };
        width -= last.width().unwrap_or(0);
      }
      out.push('…');
      return out;
    }
    width += w;
    out.push(c);
  }
  out
}

/// Render yt-dlp seconds as `M:SS` or `H:MM:SS`; anything else is shown as-is.
pub fn format_duration(raw: &str) -> String {
  let Ok(secs) = raw.parse::<u64>() else {
    return raw.to_string();
  };
  let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
  if h > 0 { format!("{h}:{m:02}:{s:02}") } else { format!("{m}:{s:02}") }
}

// --- Screens ---

pub fn clear_screen() {
  let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

pub fn banner() {
  let art = r"
  ╔══════════════════════════════════════════╗
  ║   ▶  t e r m t u b e                     ║
  ║      search · play · download            ║
  ╚══════════════════════════════════════════╝";
  println!("{}", art.yellow().bold());
}

pub fn main_menu() {
  println!("\n{}", "MAIN MENU".cyan().bold());
  for (n, label) in ["Search and Play", "Play with URL", "View History", "Exit"].iter().enumerate() {
    println!("{} {label}", format!("{}.", n + 1).green());
  }
}

pub fn search_results(results: &[SearchResult]) {
  println!("\n{}", "SEARCH RESULTS:".bold());
  for (i, result) in results.iter().enumerate() {
    println!("{} {}", format!("{}.", i + 1).green(), truncate_str(&result.title, TITLE_WIDTH));
    println!("   {}", format!("Duration: {} | Views: {}", format_duration(&result.duration), result.views).yellow());
    println!("   {}", format!("URL: {}", result.url).cyan());
  }
}

pub fn history_list(entries: &[HistoryEntry]) {
  println!("\n{}", "RECENTLY WATCHED:".bold());
  for (i, entry) in entries.iter().enumerate() {
    println!("{} {}", format!("{}.", i + 1).green(), entry.url);
    println!("   {}", format!("Time: {}", entry.timestamp).yellow());
  }
}

// --- Messages ---

pub fn info(msg: &str) {
  println!("{}", format!("[*] {msg}").blue());
}

pub fn success(msg: &str) {
  println!("{}", format!("[+] {msg}").green());
}

pub fn warn(msg: &str) {
  println!("{}", format!("[!] {msg}").yellow());
}

pub fn error(msg: &str) {
  println!("{}", format!("[!] {msg}").red());
}

/// Status line while the terminal is in raw mode, where `\n` alone does not return the carriage.
pub fn raw_status(msg: &str) {
  print!("\r{}\r\n", format!("[!] {msg}").yellow());
  let _ = io::stdout().flush();
}
