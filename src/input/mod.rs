//! System-wide input: keyboard events, clipboard reads and the keyboard
//! layout gate.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive, so it runs on a **dedicated OS thread**
//! ([`KeyboardListener`]).  That thread translates raw `rdev` events into
//! [`InputEvent`]s and pushes them into a `tokio::sync::mpsc` channel with
//! `blocking_send`; the pipeline consumes them in arrival order on a single
//! async task.
//!
//! ```text
//! rdev thread ──InputEvent──▶ mpsc ──▶ PipelineRunner (event path)
//!                                         ├─ LayoutGate::is_target_layout()
//!                                         └─ read_clipboard_word() on Ctrl+C
//! ```
//!
//! The companion window sends into the same channel (`Lookup`, `Pronounce`,
//! `Shutdown`).

pub mod clipboard;
pub mod layout;
pub mod listener;

use crate::services::Voice;

pub use clipboard::{read_clipboard_word, ClipboardError, ClipboardReader, SystemClipboard};
pub use layout::{CommandLayout, FixedLayout, LayoutError, LayoutGate, LayoutSource};
pub use listener::KeyboardListener;

#[cfg(windows)]
pub use layout::ForegroundWindowLayout;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Whether a key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// The key as far as the typing pipeline is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySymbol {
    /// Text the key produces in the current layout (`"a"`, `"Ф"`, `"."`).
    Text(String),
    Space,
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    /// Anything else (function keys, modifiers, keys without text).
    Other,
}

/// A single key event with the modifier state at the time it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub symbol: KeySymbol,
    pub phase: KeyPhase,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyEvent {
    /// Key-up event without modifiers.
    pub fn up(symbol: KeySymbol) -> Self {
        Self {
            symbol,
            phase: KeyPhase::Up,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    /// Key-up event for a text key.
    pub fn text(s: &str) -> Self {
        Self::up(KeySymbol::Text(s.to_string()))
    }
}

/// Everything the pipeline's event path consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Ctrl+C was pressed somewhere; the clipboard may hold a word to look
    /// up.
    ClipboardCopy,
    /// Look a word up on request (a clicked synonym).  `force` skips the
    /// vocabulary level filter.
    Lookup { word: String, force: bool },
    /// Play the word currently shown in the given voice.
    Pronounce(Voice),
    /// Stop the pipeline: cancel timers and drain running lookups.
    Shutdown,
}
