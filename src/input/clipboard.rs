//! Clipboard word reader backed by the `arboard` crate.
//!
//! After Ctrl+C the source application needs a moment to publish the
//! selection, so [`SystemClipboard`] waits a short settle delay before
//! reading.  Only a single English-looking word is accepted; anything else is
//! ignored.
//!
//! A short-lived [`arboard::Clipboard`] handle is created per read rather
//! than shared, because `arboard::Clipboard` is not `Send` on all platforms
//! and the handle is cheap to create.

use std::time::Duration;

use arboard::Clipboard;
use async_trait::async_trait;
use thiserror::Error;

/// Delay between the copy shortcut and the clipboard read.
pub const CLIPBOARD_SETTLE: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// ClipboardError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    Access(String),

    /// The blocking read task failed.
    #[error("clipboard read task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// ClipboardReader
// ---------------------------------------------------------------------------

/// Source of words copied by the user.
#[async_trait]
pub trait ClipboardReader: Send + Sync {
    /// The copied word, or `None` when the clipboard holds anything else.
    async fn read_word(&self) -> Result<Option<String>, ClipboardError>;
}

/// The OS clipboard.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    max_len: usize,
    settle: Duration,
}

impl SystemClipboard {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            settle: CLIPBOARD_SETTLE,
        }
    }
}

#[async_trait]
impl ClipboardReader for SystemClipboard {
    async fn read_word(&self) -> Result<Option<String>, ClipboardError> {
        read_clipboard_word(self.max_len, self.settle).await
    }
}

/// Wait `settle`, read the clipboard off the async runtime and validate it
/// with [`clipboard_word`].
pub async fn read_clipboard_word(
    max_len: usize,
    settle: Duration,
) -> Result<Option<String>, ClipboardError> {
    tokio::time::sleep(settle).await;
    let text = tokio::task::spawn_blocking(read_clipboard_text)
        .await
        .map_err(|e| ClipboardError::Task(e.to_string()))??;
    Ok(text.and_then(|t| clipboard_word(&t, max_len)))
}

/// Current plain-text clipboard content.  `Ok(None)` when the clipboard is
/// empty or holds non-text data.
pub fn read_clipboard_text() -> Result<Option<String>, ClipboardError> {
    let mut clipboard = Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
    Ok(clipboard.get_text().ok())
}

/// Trimmed `text` if it is a single word of 1..=`max_len` characters drawn
/// from ASCII letters, apostrophes and hyphens.
pub fn clipboard_word(text: &str, max_len: usize) -> Option<String> {
    let word = text.trim();
    let len = word.chars().count();
    let valid = (1..=max_len).contains(&len)
        && word
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '\'' || c == '-');
    valid.then(|| word.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_words() {
        assert_eq!(clipboard_word("  serendipity\n", 50), Some("serendipity".into()));
        assert_eq!(clipboard_word("don't", 50), Some("don't".into()));
        assert_eq!(clipboard_word("well-known", 50), Some("well-known".into()));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(clipboard_word("", 50), None);
        assert_eq!(clipboard_word("   ", 50), None);
        assert_eq!(clipboard_word("two words", 50), None);
        assert_eq!(clipboard_word("abc123", 50), None);
        assert_eq!(clipboard_word("кот", 50), None);
        assert_eq!(clipboard_word(&"a".repeat(51), 50), None);
        assert_eq!(clipboard_word(&"a".repeat(50), 50), Some("a".repeat(50)));
    }
}
