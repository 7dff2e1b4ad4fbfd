//! Lookup services consumed by the word pipeline.
//!
//! The pipeline only ever talks to the traits defined here; concrete
//! adapters live in the submodules:
//!
//! | Trait | Adapter | Backend |
//! |-------|---------|---------|
//! | [`Translator`] | [`YandexTranslator`], [`GoogleTranslator`], [`FallbackTranslator`] | REST |
//! | [`SentenceTranslator`] | [`GoogleTranslator`] | REST |
//! | [`TranslationCache`] | [`JsonTranslationCache`] | `<word>-trans.json` |
//! | [`DictionaryProvider`] | [`DictionaryApi`] | dictionaryapi.dev + `<word>-full.json` |
//! | [`ImageProvider`] | [`WebImages`] | Pexels, Wikipedia + `<word>.jpg` |
//! | [`AudioStore`] | [`TtsAudioCache`] | Google TTS + `<word>-<voice>.mp3` |
//! | [`AudioPlayer`] | [`CommandPlayer`] | external player process |
//! | [`VocabFilter`] | [`Vocabulary`] | word-frequency list |
//!
//! All traits are object-safe and `Send + Sync` so they can be shared as
//! `Arc<dyn …>` between the event path and background tasks.

pub mod audio;
pub mod cache;
pub mod dictionary;
pub mod http;
pub mod images;
pub mod translate;
pub mod vocab;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::ImageHit;

pub use audio::{AudioError, AudioProbe, CommandPlayer, TtsAudioCache, Voice};
pub use cache::{cache_size_mb, clear_cache, safe_filename, JsonTranslationCache};
pub use dictionary::DictionaryApi;
pub use http::HttpClient;
pub use images::WebImages;
pub use translate::{FallbackTranslator, GoogleTranslator, YandexTranslator};
pub use vocab::Vocabulary;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Errors a lookup service can report.  None of them is retried by the
/// pipeline; the display shows an empty field instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with an unexpected status code.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The service has nothing for this word.
    #[error("nothing found")]
    NotFound,

    /// The provider needs an API key that is not configured.
    #[error("no API key configured for {0}")]
    MissingKey(&'static str),

    /// Reading or writing a cache file failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A word translation and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Short provider tag shown in the status bar (`"Yandex"`, `"Google"`).
    pub source: String,
}

/// Dictionary entry in the dictionaryapi.dev shape.  Also the on-disk cache
/// format, so unknown fields are ignored and missing ones default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub word: String,
    pub phonetic: Option<String>,
    pub phonetics: Vec<Phonetic>,
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Phonetic {
    pub text: Option<String>,
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meaning {
    pub part_of_speech: String,
    pub definitions: Vec<Definition>,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub definition: String,
    pub example: Option<String>,
}

impl DictionaryEntry {
    /// An entry recording that the dictionary knows nothing about `word`.
    /// Cached like a real entry so the word is not queried again.
    pub fn empty(word: &str) -> Self {
        Self {
            word: word.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meanings.is_empty()
    }

    /// First non-empty transcription, preferring the top-level one.
    pub fn phonetic_text(&self) -> Option<&str> {
        self.phonetic
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| {
                self.phonetics
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .find(|t| !t.is_empty())
            })
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Decides whether a word is too common to be worth looking up.
pub trait VocabFilter: Send + Sync {
    /// Returns `(too_simple, normalized_word)`.  The normalized form is what
    /// every later lookup uses; an empty normalized word means "nothing to
    /// look up".
    fn too_simple(&self, word: &str, level: u32) -> (bool, String);
}

/// Local, synchronous translation cache.  `lookup` must be cheap enough to
/// run on the event path.
pub trait TranslationCache: Send + Sync {
    fn lookup(&self, word: &str) -> Option<String>;
    fn store(&self, word: &str, translation: &str);
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, word: &str) -> Result<Translation, FetchError>;
}

#[async_trait]
pub trait SentenceTranslator: Send + Sync {
    async fn translate_sentence(&self, text: &str) -> Result<String, FetchError>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Find an illustrative image.  [`FetchError::NotFound`] when no provider
    /// has one.
    async fn fetch_image(&self, word: &str) -> Result<ImageHit, FetchError>;
}

#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    fn load_cached(&self, word: &str) -> Option<DictionaryEntry>;

    /// Fetch the full entry.  As a side effect the pronunciation for the
    /// default voice is stored in the audio cache.
    async fn fetch_full(&self, word: &str) -> Result<DictionaryEntry, FetchError>;
}

/// Keyed store of pronunciation audio files.
pub trait AudioStore: Send + Sync {
    fn probe(&self, word: &str, voice: Voice) -> AudioProbe;
    fn cache_path(&self, word: &str, voice: Voice) -> PathBuf;
    fn tts_url(&self, word: &str, voice: Voice) -> String;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play_from_cache(&self, path: &Path) -> Result<(), AudioError>;

    /// Download `url` into `path` and play it.  Leaves a valid cache file
    /// behind on success.
    async fn stream_play_and_cache(&self, url: &str, path: &Path) -> Result<(), AudioError>;
}

// ---------------------------------------------------------------------------
// Services bundle
// ---------------------------------------------------------------------------

/// Every collaborator the pipeline needs, as shared trait objects.
#[derive(Clone)]
pub struct Services {
    pub vocab: Arc<dyn VocabFilter>,
    pub translation_cache: Arc<dyn TranslationCache>,
    pub translator: Arc<dyn Translator>,
    pub sentence_translator: Arc<dyn SentenceTranslator>,
    pub images: Arc<dyn ImageProvider>,
    pub dictionary: Arc<dyn DictionaryProvider>,
    pub audio_store: Arc<dyn AudioStore>,
    pub audio_player: Arc<dyn AudioPlayer>,
}
