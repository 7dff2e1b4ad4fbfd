//! Full dictionary entries from dictionaryapi.dev, cached as
//! `<dicts_dir>/<word>-full.json`.
//!
//! A 404 or an empty answer is not an error: it yields an empty entry that is
//! cached like a real one, so unknown words are queried only once.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::audio::{TtsAudioCache, Voice};
use super::cache::{read_json, safe_filename, write_json};
use super::http::HttpClient;
use super::{DictionaryEntry, DictionaryProvider, FetchError};

const ENDPOINT: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

pub struct DictionaryApi {
    http: HttpClient,
    dir: PathBuf,
    audio: Arc<TtsAudioCache>,
    default_voice: Voice,
}

impl DictionaryApi {
    pub fn new(
        http: HttpClient,
        dir: impl Into<PathBuf>,
        audio: Arc<TtsAudioCache>,
        default_voice: Voice,
    ) -> Self {
        Self {
            http,
            dir: dir.into(),
            audio,
            default_voice,
        }
    }

    fn path_for(&self, word: &str) -> Option<PathBuf> {
        let safe = safe_filename(word);
        (!safe.is_empty()).then(|| self.dir.join(format!("{safe}-full.json")))
    }

    async fn request(&self, word: &str) -> Result<DictionaryEntry, FetchError> {
        let url = format!("{ENDPOINT}/{}", safe_filename(word));
        let response = self.http.send(self.http.get(&url)).await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(DictionaryEntry::empty(word));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let entries: Vec<DictionaryEntry> = response.json().await?;
        Ok(entries
            .into_iter()
            .next()
            .unwrap_or_else(|| DictionaryEntry::empty(word)))
    }
}

#[async_trait]
impl DictionaryProvider for DictionaryApi {
    fn load_cached(&self, word: &str) -> Option<DictionaryEntry> {
        read_json(&self.path_for(word)?)
    }

    async fn fetch_full(&self, word: &str) -> Result<DictionaryEntry, FetchError> {
        let path = self.path_for(word).ok_or(FetchError::NotFound)?;
        let entry = self.request(word).await?;
        if let Err(e) = write_json(&path, &entry) {
            log::warn!("cache: failed to store dictionary entry for '{word}': {e}");
        }
        if let Err(e) = self.audio.download(word, self.default_voice).await {
            log::debug!("audio: pre-download for '{word}' failed: {e}");
        }
        Ok(entry)
    }
}
