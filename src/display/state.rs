//! Shared display state and the in-process [`DisplaySink`] implementation.
//!
//! [`DisplayState`] is the single source of truth for everything the
//! companion window renders: the active word and its lookup results, plus the
//! live sentence panel.
//!
//! [`SharedDisplay`] wraps it in `Arc<Mutex<…>>` and is handed to the
//! pipeline as its sink.  Every `present_*` call takes the lock for a short
//! critical section, applies the update only if the tagged key is still the
//! active one, then asks egui for a repaint so the UI thread picks the change
//! up on its next frame.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::display::{
    DisplaySink, FetchResult, ImageHit, WordKey, SENTENCE_PLACEHOLDER, SOURCE_NONE,
};
use crate::services::DictionaryEntry;

// ---------------------------------------------------------------------------
// TranslationView
// ---------------------------------------------------------------------------

/// What the translation line currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TranslationView {
    /// Waiting for the first result for the active word.
    #[default]
    Loading,
    Found(String),
    /// No translation could be obtained; the window shows the word itself.
    Missing,
}

// ---------------------------------------------------------------------------
// WordView
// ---------------------------------------------------------------------------

/// Per-word fields, cleared on every reset.
#[derive(Debug, Clone, Default)]
pub struct WordView {
    pub word: String,
    pub translation: TranslationView,
    /// Status-bar tag of the translation provider (`"..."` while loading).
    pub translation_source: String,
    pub image: Option<ImageHit>,
    /// Status-bar tag of the image provider.
    pub image_source: String,
    pub dictionary: Option<DictionaryEntry>,
    /// `true` once a dictionary answer (possibly empty) has arrived.
    pub dictionary_loaded: bool,
}

impl WordView {
    fn reset(word: &str) -> Self {
        Self {
            word: word.to_string(),
            translation_source: "...".into(),
            image_source: "...".into(),
            ..Self::default()
        }
    }

    /// Compact status line, e.g. `Tr: Cache • Img: Wiki`.
    pub fn status_line(&self) -> String {
        format!("Tr: {} • Img: {}", self.translation_source, self.image_source)
    }
}

// ---------------------------------------------------------------------------
// DisplayState
// ---------------------------------------------------------------------------

/// Everything the companion window renders.
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Key of the word currently shown; results for any other key are stale.
    pub active: Option<WordKey>,
    pub view: WordView,
    /// Sentence being typed, with the cursor marker.
    pub live_sentence: String,
    pub sentence_translation: String,
    /// Number of results dropped because their key was superseded.
    pub stale_dropped: u64,
}

impl DisplayState {
    pub fn new() -> Self {
        Self {
            sentence_translation: SENTENCE_PLACEHOLDER.into(),
            ..Self::default()
        }
    }

    /// `true` when `key` is the active word key.
    pub fn is_current(&self, key: &WordKey) -> bool {
        self.active.as_ref() == Some(key)
    }
}

// ---------------------------------------------------------------------------
// SharedDisplay
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`DisplayState`].
///
/// Cheap to clone.  Lock with [`SharedDisplay::lock`] for a short critical
/// section; do **not** hold the guard across `.await` points.
#[derive(Clone)]
pub struct SharedDisplay {
    state: Arc<Mutex<DisplayState>>,
    repaint: Arc<OnceLock<egui::Context>>,
}

impl SharedDisplay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState::new())),
            repaint: Arc::new(OnceLock::new()),
        }
    }

    /// Attach the egui context so updates trigger a repaint.  Only the first
    /// call has an effect.
    pub fn attach_repaint(&self, ctx: egui::Context) {
        let _ = self.repaint.set(ctx);
    }

    /// Lock the state.  A poisoned lock is recovered: display state holds no
    /// invariants a panicking writer could break halfway.
    pub fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_repaint(&self) {
        if let Some(ctx) = self.repaint.get() {
            ctx.request_repaint();
        }
    }

    /// Run `apply` only when `key` is still active; count the drop otherwise.
    fn apply_if_current(&self, key: &WordKey, field: &str, apply: impl FnOnce(&mut WordView)) {
        {
            let mut st = self.lock();
            if !st.is_current(key) {
                st.stale_dropped += 1;
                log::debug!("display: dropped stale {field} for {key}");
                return;
            }
            apply(&mut st.view);
        }
        self.request_repaint();
    }
}

impl Default for SharedDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for SharedDisplay {
    fn present_word_reset(&self, key: &WordKey) {
        {
            let mut st = self.lock();
            st.active = Some(key.clone());
            st.view = WordView::reset(key.word());
        }
        self.request_repaint();
    }

    fn present_translation(&self, key: &WordKey, result: FetchResult<String>, source: &str) {
        self.apply_if_current(key, "translation", |view| match result {
            FetchResult::Cached(text) | FetchResult::Fetched(text) if !text.trim().is_empty() => {
                view.translation = TranslationView::Found(text);
                view.translation_source = source.to_string();
            }
            _ => {
                view.translation = TranslationView::Missing;
                view.translation_source = SOURCE_NONE.into();
            }
        });
    }

    fn present_image(&self, key: &WordKey, result: FetchResult<ImageHit>) {
        self.apply_if_current(key, "image", |view| match result {
            FetchResult::Cached(hit) | FetchResult::Fetched(hit) => {
                view.image_source = hit.source.clone();
                view.image = Some(hit);
            }
            FetchResult::Absent | FetchResult::Error(_) => {
                view.image = None;
                view.image_source = SOURCE_NONE.into();
            }
        });
    }

    fn present_dictionary(&self, key: &WordKey, result: FetchResult<DictionaryEntry>) {
        self.apply_if_current(key, "dictionary", |view| {
            view.dictionary = match result {
                FetchResult::Cached(entry) | FetchResult::Fetched(entry) => Some(entry),
                FetchResult::Absent | FetchResult::Error(_) => None,
            };
            view.dictionary_loaded = true;
        });
    }

    fn present_live_sentence_text(&self, text: &str) {
        self.lock().live_sentence = text.to_string();
        self.request_repaint();
    }

    fn present_sentence_translation(&self, text: &str) {
        self.lock().sentence_translation = text.to_string();
        self.request_repaint();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
