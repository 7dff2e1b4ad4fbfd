//! Word-frequency vocabulary used to skip words the user already knows.
//!
//! The list (`vocab_20k.txt`, one word per line, most frequent first) is
//! downloaded once into the data directory.  A word is "too simple" when the
//! rank of its lemma is below `level × 100`; unknown words rank last.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use super::cache::write_atomic;
use super::http::HttpClient;
use super::VocabFilter;

pub const VOCAB_LIST_URL: &str =
    "https://raw.githubusercontent.com/first20hours/google-10000-english/master/20k.txt";

/// Minimal list used when the real one cannot be obtained.
const FALLBACK_WORDS: &str = "the\nof\nand\na\nto\nin";

/// The most frequent words are taken verbatim; stripping suffixes from them
/// does more harm than good (`this` → `thi`).
const TOP_WORDS_NO_LEMMA: usize = 1000;

/// Rank reported for words missing from the list.
pub const UNKNOWN_RANK: usize = 99_999;

/// A stored list smaller than this is treated as corrupt.
const MIN_LIST_FILE_SIZE: u64 = 100;
/// A downloaded list smaller than this is rejected.
const MIN_DOWNLOAD_SIZE: usize = 1000;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Vocabulary {
    ranks: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from newline-separated words, most frequent first.  Duplicates
    /// keep their best rank.
    pub fn from_list(text: &str) -> Self {
        let mut ranks = HashMap::new();
        for (rank, word) in text
            .lines()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .enumerate()
        {
            ranks.entry(word).or_insert(rank);
        }
        Self { ranks }
    }

    pub fn fallback() -> Self {
        Self::from_list(FALLBACK_WORDS)
    }

    /// Load the list from `path`, downloading it first if it is missing or
    /// truncated.  A failed download leaves the built-in fallback list on
    /// disk; that file is accepted as-is on later starts, so an offline
    /// machine does not wait for the network every time.
    pub async fn load_or_download(path: &Path) -> Result<Self> {
        if let Some(vocab) = Self::load_from_disk(path).await? {
            log::info!("vocab: loaded {} words", vocab.len());
            return Ok(vocab);
        }

        let text = match download_list().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("vocab: download failed, using built-in list: {e}");
                FALLBACK_WORDS.to_string()
            }
        };
        if let Err(e) = write_atomic(path, text.as_bytes()) {
            log::warn!("vocab: failed to save {}: {e}", path.display());
        }
        Ok(Self::from_list(&text))
    }

    /// The stored list, or `None` when it is missing or truncated (a
    /// truncated file is removed).
    async fn load_from_disk(path: &Path) -> Result<Option<Self>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading vocabulary list {}", path.display()))
            }
        };
        if !is_complete_list(&text) {
            log::warn!("vocab: {} looks truncated, re-downloading", path.display());
            let _ = tokio::fs::remove_file(path).await;
            return Ok(None);
        }
        Ok(Some(Self::from_list(&text)))
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn rank(&self, word: &str) -> usize {
        self.ranks.get(word).copied().unwrap_or(UNKNOWN_RANK)
    }

    fn contains(&self, word: &str) -> bool {
        self.ranks.contains_key(word)
    }

    /// Reduce an inflected form to a word present in the list.  Returns the
    /// input unchanged when it is a top word or no rule yields a known word.
    pub fn lemmatize(&self, word: &str) -> String {
        if self.rank(word) < TOP_WORDS_NO_LEMMA {
            return word.to_string();
        }
        suffix_candidates(word)
            .into_iter()
            .find(|c| c.len() >= 2 && self.contains(c))
            .unwrap_or_else(|| word.to_string())
    }
}

/// Long enough to be a real list, or exactly the built-in one.
fn is_complete_list(text: &str) -> bool {
    text.len() as u64 >= MIN_LIST_FILE_SIZE || text.trim() == FALLBACK_WORDS
}

async fn download_list() -> Result<String> {
    let http = HttpClient::new(DOWNLOAD_TIMEOUT);
    let bytes = http.get_bytes(VOCAB_LIST_URL).await?;
    let text = String::from_utf8(bytes).context("vocabulary list is not UTF-8")?;
    anyhow::ensure!(
        text.len() > MIN_DOWNLOAD_SIZE,
        "vocabulary list too short ({} bytes)",
        text.len()
    );
    Ok(text)
}

/// Lowercase, keep letters, apostrophes and hyphens, trim punctuation from
/// both ends and drop a possessive `'s`.
pub fn normalize(word: &str) -> String {
    let kept: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '\'' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let trimmed = kept.trim_matches(|c| c == '\'' || c == '-');
    trimmed.strip_suffix("'s").unwrap_or(trimmed).to_string()
}

/// Candidate base forms for `word`, most specific rule first.
fn suffix_candidates(word: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut push = |s: String| {
        if !s.is_empty() && s != word && !out.contains(&s) {
            out.push(s);
        }
    };

    if let Some(stem) = word.strip_suffix("ies") {
        push(format!("{stem}y"));
    }
    if let Some(stem) = word.strip_suffix("ied") {
        push(format!("{stem}y"));
    }
    if let Some(stem) = word.strip_suffix("ves") {
        push(format!("{stem}f"));
        push(format!("{stem}fe"));
    }
    for suffix in ["ing", "ed", "er", "est"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            push(stem.to_string());
            push(format!("{stem}e"));
            if let Some(single) = undouble(stem) {
                push(single);
            }
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        push(stem.to_string());
    }
    if !word.ends_with("ss") {
        if let Some(stem) = word.strip_suffix('s') {
            push(stem.to_string());
        }
    }
    if let Some(stem) = word.strip_suffix("ly") {
        push(stem.to_string());
    }
    out
}

/// `runn` → `run`, `stopp` → `stop`.
fn undouble(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    (n >= 3 && bytes[n - 1] == bytes[n - 2] && !b"aeiou".contains(&bytes[n - 1]))
        .then(|| stem[..n - 1].to_string())
}

impl VocabFilter for Vocabulary {
    fn too_simple(&self, word: &str, level: u32) -> (bool, String) {
        let normalized = normalize(word);
        if normalized.is_empty() {
            return (false, normalized);
        }
        let lemma = self.lemmatize(&normalized);
        let cutoff = level as usize * 100;
        (self.rank(&lemma) < cutoff, lemma)
    }
}
