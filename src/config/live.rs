//! Runtime-adjustable settings shared between the companion window and the
//! pipeline.
//!
//! The UI thread flips these while lookups are running on tokio workers, so
//! they are plain atomics: readers always see the latest value and no lock is
//! ever held across a frame or a fetch.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::UserConfig;

/// Highest accepted vocabulary level.
pub const MAX_VOCAB_LEVEL: u32 = 100;

#[derive(Debug)]
struct Inner {
    vocab_level: AtomicU32,
    auto_pronounce: AtomicBool,
    show_sentence_window: AtomicBool,
}

/// Cheap-to-clone handle to the live settings.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    inner: Arc<Inner>,
}

impl LiveSettings {
    pub fn new(user: &UserConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                vocab_level: AtomicU32::new(user.vocab_level.min(MAX_VOCAB_LEVEL)),
                auto_pronounce: AtomicBool::new(user.auto_pronounce),
                show_sentence_window: AtomicBool::new(user.show_sentence_window),
            }),
        }
    }

    pub fn vocab_level(&self) -> u32 {
        self.inner.vocab_level.load(Ordering::Relaxed)
    }

    /// Set the vocabulary level, clamped to `0..=MAX_VOCAB_LEVEL`.
    pub fn set_vocab_level(&self, level: u32) {
        self.inner
            .vocab_level
            .store(level.min(MAX_VOCAB_LEVEL), Ordering::Relaxed);
    }

    /// Shift the level by `delta`, saturating at both ends.  Returns the new
    /// level.
    pub fn adjust_vocab_level(&self, delta: i32) -> u32 {
        let current = self.vocab_level() as i64;
        let next = (current + delta as i64).clamp(0, MAX_VOCAB_LEVEL as i64) as u32;
        self.set_vocab_level(next);
        next
    }

    pub fn auto_pronounce(&self) -> bool {
        self.inner.auto_pronounce.load(Ordering::Relaxed)
    }

    pub fn set_auto_pronounce(&self, on: bool) {
        self.inner.auto_pronounce.store(on, Ordering::Relaxed);
    }

    pub fn show_sentence_window(&self) -> bool {
        self.inner.show_sentence_window.load(Ordering::Relaxed)
    }

    pub fn set_show_sentence_window(&self, on: bool) {
        self.inner.show_sentence_window.store(on, Ordering::Relaxed);
    }

    /// Copy the live values back into a [`UserConfig`] for persistence.
    pub fn write_back(&self, user: &mut UserConfig) {
        user.vocab_level = self.vocab_level();
        user.auto_pronounce = self.auto_pronounce();
        user.show_sentence_window = self.show_sentence_window();
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::new(&UserConfig::default())
    }
}
