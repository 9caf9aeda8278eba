use arboard::Clipboard;

use crate::error::{Error, Result};

/// Clipboard backend, swappable in tests.
pub trait ClipboardProvider {
  fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard via arboard. Opened per copy; headless sessions fail here.
pub struct SystemClipboard;

impl ClipboardProvider for SystemClipboard {
  fn set_text(&mut self, text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().map_err(|e| Error::ClipboardError(e.to_string()))?;
    clipboard.set_text(text.to_string()).map_err(|e| Error::ClipboardError(e.to_string()))
  }
}

/// Copy `text`, rejecting empty input up front.
pub fn copy_with(provider: &mut dyn ClipboardProvider, text: &str) -> Result<()> {
  if text.trim().is_empty() {
    return Err(Error::ClipboardError("nothing to copy".to_string()));
  }
  provider.set_text(text)
}
