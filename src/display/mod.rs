//! Presentation contract between the pipeline and whatever renders results.
//!
//! Every lookup result travels to the display tagged with the [`WordKey`] it
//! was computed for.  The pipeline never decides whether a result is still
//! wanted; the sink compares the tag with its currently active key and drops
//! mismatches.  That makes the outcome independent of which background task
//! happens to finish last.
//!
//! ```text
//! WordOrchestrator ──present_word_reset(k2)──▶ sink.active = k2
//! task(k1) ─────────present_translation(k1)──▶ k1 != k2 → dropped
//! task(k2) ─────────present_image(k2)────────▶ applied
//! ```
//!
//! * [`DisplaySink`]: trait implemented by presentation layers.
//! * [`SharedDisplay`]: the in-process implementation read by the egui
//!   window every frame.

pub mod state;

use std::fmt;
use std::path::PathBuf;

pub use state::{DisplayState, SharedDisplay, TranslationView, WordView};

use crate::services::DictionaryEntry;

// ---------------------------------------------------------------------------
// WordKey
// ---------------------------------------------------------------------------

/// Identity of one word lookup.
///
/// `generation` increases with every reset, so typing the same word twice
/// yields two distinct keys and results of the first round can never land on
/// the second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordKey {
    word: String,
    generation: u64,
}

impl WordKey {
    pub fn new(word: impl Into<String>, generation: u64) -> Self {
        Self {
            word: word.into(),
            generation,
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for WordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.word, self.generation)
    }
}

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// Outcome of one cache-first lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    /// Served from a local cache.
    Cached(T),
    /// Fetched from the network.
    Fetched(T),
    /// The service answered but has nothing for this word.
    Absent,
    /// The lookup failed; carries a short description for logs and tooltips.
    Error(String),
}

impl<T> FetchResult<T> {
    /// The payload, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            FetchResult::Cached(v) | FetchResult::Fetched(v) => Some(v),
            FetchResult::Absent | FetchResult::Error(_) => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, FetchResult::Cached(_))
    }
}

// ---------------------------------------------------------------------------
// ImageHit
// ---------------------------------------------------------------------------

/// A locally stored illustrative image and the provider it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHit {
    pub path: PathBuf,
    pub source: String,
}

impl ImageHit {
    /// URI understood by egui's file loader.
    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// DisplaySink
// ---------------------------------------------------------------------------

/// Source tag shown for translations served from the local cache.
pub const SOURCE_CACHE: &str = "Cache";
/// Source tag shown when no translation could be obtained.
pub const SOURCE_NONE: &str = "—";
/// Text shown in the sentence panel when there is nothing to translate.
pub const SENTENCE_PLACEHOLDER: &str = "...";

/// Receiver of everything the pipeline wants shown.
///
/// Implementations must be callable from any task and deliver each call
/// exactly once.  No ordering is promised across different fields; result
/// calls for a key other than the most recent [`present_word_reset`] key must
/// be discarded.
///
/// [`present_word_reset`]: DisplaySink::present_word_reset
pub trait DisplaySink: Send + Sync {
    /// A new word became current; clear per-word fields and show `key.word()`.
    fn present_word_reset(&self, key: &WordKey);

    fn present_translation(&self, key: &WordKey, result: FetchResult<String>, source: &str);

    fn present_image(&self, key: &WordKey, result: FetchResult<ImageHit>);

    fn present_dictionary(&self, key: &WordKey, result: FetchResult<DictionaryEntry>);

    /// Live text of the sentence being typed, with the cursor marker.
    fn present_live_sentence_text(&self, text: &str);

    fn present_sentence_translation(&self, text: &str);
}
