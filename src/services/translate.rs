//! Word and sentence translators.
//!
//! * [`YandexTranslator`] queries the Yandex Dictionary API (needs a key) and
//!   returns up to three meanings, favouring one per part of speech.
//! * [`GoogleTranslator`] uses the public `translate_a/single` endpoint; it
//!   serves both single words and whole sentences.
//! * [`FallbackTranslator`] tries a chain of translators in order and returns
//!   the first success.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::http::HttpClient;
use super::{FetchError, SentenceTranslator, Translation, Translator};

const YANDEX_ENDPOINT: &str = "https://dictionary.yandex.net/api/v1/dicservice.json/lookup";
const GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Most meanings shown for a single word.
const MAX_MEANINGS: usize = 3;

// ---------------------------------------------------------------------------
// YandexTranslator
// ---------------------------------------------------------------------------

pub struct YandexTranslator {
    http: HttpClient,
    key: String,
    source_lang: String,
    target_lang: String,
}

impl YandexTranslator {
    pub fn new(http: HttpClient, key: impl Into<String>, source_lang: &str, target_lang: &str) -> Self {
        Self {
            http,
            key: key.into(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }
}

#[async_trait]
impl Translator for YandexTranslator {
    async fn translate(&self, word: &str) -> Result<Translation, FetchError> {
        if self.key.is_empty() {
            return Err(FetchError::MissingKey("yandex"));
        }
        let lang = format!("{}-{}", self.source_lang, self.target_lang);
        let request = self.http.get(YANDEX_ENDPOINT).query(&[
            ("key", self.key.as_str()),
            ("lang", lang.as_str()),
            ("text", word),
            ("ui", self.target_lang.as_str()),
        ]);
        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        let meanings = collect_yandex_meanings(&json);
        if meanings.is_empty() {
            return Err(FetchError::NotFound);
        }
        Ok(Translation {
            text: meanings.join(", "),
            source: "Yandex".into(),
        })
    }
}

/// Pick up to [`MAX_MEANINGS`] translations from a Yandex lookup answer.
///
/// The first translation of each part of speech goes in first, then the
/// remaining slots are filled with further translations of the first part of
/// speech.  Duplicates are skipped.
fn collect_yandex_meanings(json: &Value) -> Vec<String> {
    let Some(defs) = json["def"].as_array() else {
        return Vec::new();
    };
    let translations = |def: &Value| -> Vec<String> {
        def["tr"]
            .as_array()
            .map(|trs| {
                trs.iter()
                    .filter_map(|tr| tr["text"].as_str())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut out: Vec<String> = Vec::with_capacity(MAX_MEANINGS);
    for def in defs {
        if out.len() == MAX_MEANINGS {
            return out;
        }
        if let Some(first) = translations(def).into_iter().next() {
            if !out.contains(&first) {
                out.push(first);
            }
        }
    }
    if let Some(first_def) = defs.first() {
        for extra in translations(first_def).into_iter().skip(1) {
            if out.len() == MAX_MEANINGS {
                break;
            }
            if !out.contains(&extra) {
                out.push(extra);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GoogleTranslator
// ---------------------------------------------------------------------------

pub struct GoogleTranslator {
    http: HttpClient,
    source_lang: String,
    target_lang: String,
}

impl GoogleTranslator {
    pub fn new(http: HttpClient, source_lang: &str, target_lang: &str) -> Self {
        Self {
            http,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }

    async fn request(&self, text: &str) -> Result<String, FetchError> {
        let request = self.http.get(GOOGLE_ENDPOINT).query(&[
            ("client", "gtx"),
            ("sl", self.source_lang.as_str()),
            ("tl", self.target_lang.as_str()),
            ("dt", "t"),
            ("q", text),
        ]);
        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        let joined = join_google_segments(&json)
            .ok_or_else(|| FetchError::Parse("missing translation segments".into()))?;
        if joined.trim().is_empty() {
            return Err(FetchError::NotFound);
        }
        Ok(joined)
    }
}

/// Concatenate the translated segments of a `translate_a/single` answer:
/// `[[["Привет","Hello",…],["мир","world",…]], …]`.
fn join_google_segments(json: &Value) -> Option<String> {
    let segments = json.get(0)?.as_array()?;
    Some(
        segments
            .iter()
            .filter_map(|seg| seg.get(0).and_then(Value::as_str))
            .collect(),
    )
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, word: &str) -> Result<Translation, FetchError> {
        let text = self.request(word).await?;
        Ok(Translation {
            text: text.trim().to_string(),
            source: "Google".into(),
        })
    }
}

#[async_trait]
impl SentenceTranslator for GoogleTranslator {
    async fn translate_sentence(&self, text: &str) -> Result<String, FetchError> {
        self.request(text).await
    }
}

// ---------------------------------------------------------------------------
// FallbackTranslator
// ---------------------------------------------------------------------------

/// Tries each translator in order; the first `Ok` wins.
///
/// When every translator fails the last error is returned, so a chain ending
/// in a keyless provider still reports the most relevant failure.
pub struct FallbackTranslator {
    chain: Vec<Arc<dyn Translator>>,
}

impl FallbackTranslator {
    pub fn new(chain: Vec<Arc<dyn Translator>>) -> Self {
        Self { chain }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl Translator for FallbackTranslator {
    async fn translate(&self, word: &str) -> Result<Translation, FetchError> {
        let mut last_err = FetchError::NotFound;
        for translator in &self.chain {
            match translator.translate(word).await {
                Ok(t) => return Ok(t),
                Err(e) => {
                    log::debug!("net: translator failed for '{word}', trying next: {e}");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
