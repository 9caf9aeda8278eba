//! Startup check for the external programs the session shells out to.
//!
//! Missing programs are reported as `DependencyMissing`. When an install
//! command is configured (Termux gets `pkg install -y` by default) it is run
//! once with the missing names and the check is repeated.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{info, warn};

use crate::config::{Config, command, program_name};
use crate::constants::constants;
use crate::error::{Error, Result};

/// Locate `program` on `PATH`, or accept it directly if it is a path.
pub fn find_program(program: &str) -> Option<PathBuf> {
  let direct = Path::new(program);
  if direct.components().count() > 1 {
    return direct.is_file().then(|| direct.to_path_buf());
  }
  let path = std::env::var_os("PATH")?;
  let extensions: Vec<String> = if cfg!(windows) {
    std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT".into()).split(';').map(str::to_string).collect()
  } else {
    vec![String::new()]
  };
  std::env::split_paths(&path)
    .flat_map(|dir| extensions.iter().map(move |ext| dir.join(format!("{program}{ext}"))))
    .find(|candidate| candidate.is_file())
}

/// Required programs, with the player and helper replaced by their configured names.
pub fn required_programs(config: &Config) -> Vec<String> {
  let mut programs: Vec<String> = constants()
    .required_programs
    .iter()
    .map(|p| match p.as_str() {
      "mpv" => program_name(&config.player).to_string(),
      "yt-dlp" => program_name(&config.helper).to_string(),
      other => other.to_string(),
    })
    .collect();
  programs.dedup();
  programs
}

/// Fail with the list of programs that are not installed.
pub fn check(programs: &[String]) -> Result<()> {
  let missing: Vec<String> = programs.iter().filter(|p| find_program(p).is_none()).cloned().collect();
  if missing.is_empty() { Ok(()) } else { Err(Error::DependencyMissing(missing)) }
}

/// Check, install what is missing if possible, and check again.
pub async fn ensure(config: &Config) -> Result<()> {
  let programs = required_programs(config);
  let missing = match check(&programs) {
    Ok(()) => {
      info!(?programs, "deps: all dependencies present");
      return Ok(());
    }
    Err(Error::DependencyMissing(missing)) => missing,
    Err(e) => return Err(e),
  };

  if config.install_command.is_empty() {
    return Err(Error::DependencyMissing(missing));
  }

  warn!(?missing, installer = %program_name(&config.install_command), "deps: installing missing packages");
  let status = command(&config.install_command)
    .args(&missing)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .await;
  if let Err(e) = &status {
    warn!(err = %e, "deps: installer failed to start");
  }
  check(&programs)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(unix)]
  #[test]
  fn find_program_on_path() {
    assert!(find_program("sh").is_some());
  }

  #[test]
  fn find_program_missing() {
    assert!(find_program("termtube-no-such-program").is_none());
  }

  #[cfg(unix)]
  #[test]
  fn find_program_accepts_paths() {
    assert!(find_program("/bin/sh").is_some());
    assert!(find_program("/nonexistent/sh").is_none());
  }

  #[test]
  fn required_programs_follow_config() {
    let config = Config {
      player: vec!["/opt/mpv/bin/mpv".into()],
      helper: vec!["yt-dlp".into(), "--quiet".into()],
      ..Config::default()
    };
    assert_eq!(required_programs(&config), vec!["/opt/mpv/bin/mpv", "yt-dlp", "ffmpeg"]);
  }

  #[test]
  fn check_lists_only_missing() {
    let programs = vec!["termtube-missing-a".to_string(), "termtube-missing-b".to_string()];
    match check(&programs) {
      Err(Error::DependencyMissing(missing)) => assert_eq!(missing, programs),
      other => panic!("expected DependencyMissing, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn ensure_without_installer_reports_missing() {
    let config = Config {
      player: vec!["termtube-missing-player".into()],
      install_command: Vec::new(),
      ..Config::default()
    };
    let err = ensure(&config).await.unwrap_err();
    assert!(err.to_string().contains("termtube-missing-player"));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn ensure_rechecks_after_install() {
    let config = Config {
      player: vec!["termtube-missing-player".into()],
      install_command: vec!["sh".into(), "-c".into(), "exit 0".into(), "pkg".into()],
      ..Config::default()
    };
    assert!(matches!(ensure(&config).await, Err(Error::DependencyMissing(_))));
  }
}
