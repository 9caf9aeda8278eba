use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use tracing::{info, warn};

use crate::config::{command, program_name};
use crate::constants::constants;
use crate::error::{Error, Result, spawn_message};

/// A single entry from a search listing, in helper output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
  pub title: String,
  pub id: String,
  /// Seconds as reported by yt-dlp, or "N/A".
  pub duration: String,
  pub views: String,
  pub url: String,
}

/// The subset of a `yt-dlp -j` record we read.
#[derive(Debug, Deserialize)]
struct RawEntry {
  title: String,
  id: String,
  #[serde(default)]
  duration: Option<Value>,
  #[serde(default)]
  view_count: Option<Value>,
  #[serde(default)]
  webpage_url: Option<String>,
  #[serde(default)]
  url: Option<String>,
}

/// Stringify a JSON scalar, dropping a trailing `.0` on whole floats.
fn scalar_to_string(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "N/A".to_string(),
    Some(Value::String(s)) if s.is_empty() => "N/A".to_string(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) => match n.as_f64() {
      Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
      _ => n.to_string(),
    },
    Some(other) => other.to_string(),
  }
}

impl From<RawEntry> for SearchResult {
  fn from(raw: RawEntry) -> Self {
    let url = raw
      .webpage_url
      .filter(|u| !u.is_empty())
      .or(raw.url.filter(|u| u.starts_with("http")))
      .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", raw.id));
    SearchResult {
      duration: scalar_to_string(raw.duration.as_ref()),
      views: scalar_to_string(raw.view_count.as_ref()),
      title: raw.title,
      id: raw.id,
      url,
    }
  }
}

/// Parse yt-dlp `-j` output. One malformed line fails the whole listing.
fn parse_search_output(stdout: &str) -> Result<Vec<SearchResult>> {
  stdout
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .enumerate()
    .map(|(n, line)| {
      serde_json::from_str::<RawEntry>(line)
        .map(SearchResult::from)
        .map_err(|e| Error::SearchFailed(format!("unreadable result on line {}: {}", n + 1, e)))
    })
    .collect()
}

/// Run a flat yt-dlp search for `query` and return up to `search_results` entries.
pub async fn search_youtube(helper: &[String], query: &str) -> Result<Vec<SearchResult>> {
  let target = format!("ytsearch{}:{}", constants().search_results, query);
  info!(query = %query, "search: invoking helper");

  let output = command(helper)
    .args(["--flat-playlist", "-j", "--no-warnings", "--", &target])
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .await
    .map_err(|e| Error::SearchFailed(spawn_message(program_name(helper), &e)))?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    warn!(status = %output.status, stderr = %stderr.trim(), "search: helper failed");
    return Err(Error::SearchFailed(format!("{} exited with {}", program_name(helper), output.status)));
  }

  let stdout = String::from_utf8(output.stdout).map_err(|_| Error::SearchFailed("helper output non-UTF8".into()))?;
  let results = parse_search_output(&stdout)?;
  info!(count = results.len(), "search: parsed results");
  Ok(results)
}

/// Accept only watch URLs and short links.
pub fn is_youtube_url(input: &str) -> bool {
  input.contains("youtube.com/watch?v=") || input.contains("youtu.be/")
}

/// yt-dlp format selector capped at `height` pixels.
pub fn quality_selector(height: u32) -> String {
  format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]", h = height)
}

#[cfg(test)]
mod tests {
  use super::*;

  const LINE_A: &str = r#"{"title": "Lofi Beats", "id": "aaa", "duration": 213.0, "view_count": 1200, "webpage_url": "https://www.youtube.com/watch?v=aaa"}"#;
  const LINE_B: &str = r#"{"title": "Live Radio", "id": "bbb", "duration": null, "url": "https://www.youtube.com/watch?v=bbb"}"#;
  const LINE_C: &str = r#"{"title": "Bare", "id": "ccc", "url": "ccc"}"#;

  // --- parse_search_output ---

  #[test]
  fn parse_maps_fields() {
    let results = parse_search_output(LINE_A).unwrap();
    assert_eq!(
      results,
      vec![SearchResult {
        title: "Lofi Beats".into(),
        id: "aaa".into(),
        duration: "213".into(),
        views: "1200".into(),
        url: "https://www.youtube.com/watch?v=aaa".into(),
      }]
    );
  }

  #[test]
  fn parse_missing_values_become_na() {
    let results = parse_search_output(LINE_B).unwrap();
    assert_eq!(results[0].duration, "N/A");
    assert_eq!(results[0].views, "N/A");
    assert_eq!(results[0].url, "https://www.youtube.com/watch?v=bbb");
  }

  #[test]
  fn parse_builds_url_from_id_when_needed() {
    let results = parse_search_output(LINE_C).unwrap();
    assert_eq!(results[0].url, "https://www.youtube.com/watch?v=ccc");
  }

  #[test]
  fn parse_preserves_order_and_skips_blank_lines() {
    let stdout = format!("{LINE_A}\n\n{LINE_B}\n   \n{LINE_C}\n");
    let ids: Vec<_> = parse_search_output(&stdout).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["aaa", "bbb", "ccc"]);
  }

  #[test]
  fn parse_one_bad_line_fails_everything() {
    let stdout = format!("{LINE_A}\nWARNING: not json\n{LINE_B}");
    assert!(matches!(parse_search_output(&stdout), Err(Error::SearchFailed(_))));
  }

  #[test]
  fn parse_missing_title_fails() {
    assert!(parse_search_output(r#"{"id": "x"}"#).is_err());
  }

  #[test]
  fn parse_empty_output_is_empty() {
    assert!(parse_search_output("").unwrap().is_empty());
  }

  #[test]
  fn scalar_keeps_fractional_floats() {
    assert_eq!(scalar_to_string(Some(&serde_json::json!(12.5))), "12.5");
    assert_eq!(scalar_to_string(Some(&serde_json::json!("1:02"))), "1:02");
  }

  // --- is_youtube_url ---

  #[test]
  fn youtube_url_detection() {
    assert!(is_youtube_url("https://www.youtube.com/watch?v=abc"));
    assert!(is_youtube_url("https://youtu.be/abc"));
    assert!(!is_youtube_url("https://vimeo.com/123"));
    assert!(!is_youtube_url("lofi"));
  }

  #[test]
  fn quality_selector_caps_height() {
    assert_eq!(quality_selector(720), "bestvideo[height<=720]+bestaudio/best[height<=720]");
  }

  // --- search_youtube (fake helper via sh -c) ---

  #[cfg(unix)]
  fn sh(script: &str) -> Vec<String> {
    vec!["sh".into(), "-c".into(), script.into(), "yt-dlp".into()]
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn search_runs_helper_with_flat_ten_result_query() {
    let dir = tempfile::tempdir().unwrap();
    let args_file = dir.path().join("args");
    let script = format!("echo \"$@\" > '{}'; printf '%s\\n' '{LINE_A}' '{LINE_B}'", args_file.display());
    let results = search_youtube(&sh(&script), "lofi").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Lofi Beats");
    let args = std::fs::read_to_string(args_file).unwrap();
    assert_eq!(args.trim(), "--flat-playlist -j --no-warnings -- ytsearch10:lofi");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn search_nonzero_exit_fails() {
    let err = search_youtube(&sh("exit 2"), "lofi").await.unwrap_err();
    assert!(matches!(err, Error::SearchFailed(_)));
  }

  #[tokio::test]
  async fn search_missing_helper_fails() {
    let helper = vec!["termtube-no-such-helper".to_string()];
    let err = search_youtube(&helper, "lofi").await.unwrap_err();
    assert!(err.to_string().contains("not found"));
  }
}
