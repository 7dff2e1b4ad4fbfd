//! Hand-written doubles for pipeline tests.  Every double records its calls
//! and can be given an artificial latency, so tests run under a paused tokio
//! clock without touching the network or the disk.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::LiveSettings;
use crate::display::{DisplaySink, FetchResult, ImageHit, WordKey};
use crate::services::{
    AudioError, AudioPlayer, AudioProbe, AudioStore, Definition, DictionaryEntry,
    DictionaryProvider, FetchError, ImageProvider, Meaning, SentenceTranslator, Services,
    Translation, TranslationCache, Translator, VocabFilter, Voice,
};

use super::orchestrator::WordOrchestrator;
use super::pronounce::AudioSync;
use super::tasks::TaskPool;

type ErrorFactory = Box<dyn Fn() -> FetchError + Send + Sync>;

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

fn entry_for(word: &str) -> DictionaryEntry {
    DictionaryEntry {
        word: word.to_string(),
        phonetic: Some(format!("/{word}/")),
        meanings: vec![Meaning {
            part_of_speech: "noun".into(),
            definitions: vec![Definition {
                definition: format!("meaning of {word}"),
                example: None,
            }],
            synonyms: Vec::new(),
        }],
        ..DictionaryEntry::default()
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// One recorded [`DisplaySink`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Reset(WordKey),
    Translation {
        key: WordKey,
        result: FetchResult<String>,
        source: String,
    },
    Image {
        key: WordKey,
        result: FetchResult<ImageHit>,
    },
    Dictionary {
        key: WordKey,
        cached: bool,
    },
    LiveText(String),
    SentenceTranslation(String),
}

impl SinkCall {
    pub fn key(&self) -> Option<&WordKey> {
        match self {
            SinkCall::Reset(key)
            | SinkCall::Translation { key, .. }
            | SinkCall::Image { key, .. }
            | SinkCall::Dictionary { key, .. } => Some(key),
            SinkCall::LiveText(_) | SinkCall::SentenceTranslation(_) => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sentence_translations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::SentenceTranslation(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DisplaySink for RecordingSink {
    fn present_word_reset(&self, key: &WordKey) {
        self.record(SinkCall::Reset(key.clone()));
    }

    fn present_translation(&self, key: &WordKey, result: FetchResult<String>, source: &str) {
        self.record(SinkCall::Translation {
            key: key.clone(),
            result,
            source: source.to_string(),
        });
    }

    fn present_image(&self, key: &WordKey, result: FetchResult<ImageHit>) {
        self.record(SinkCall::Image {
            key: key.clone(),
            result,
        });
    }

    fn present_dictionary(&self, key: &WordKey, result: FetchResult<DictionaryEntry>) {
        self.record(SinkCall::Dictionary {
            key: key.clone(),
            cached: result.is_cached(),
        });
    }

    fn present_live_sentence_text(&self, text: &str) {
        self.record(SinkCall::LiveText(text.to_string()));
    }

    fn present_sentence_translation(&self, text: &str) {
        self.record(SinkCall::SentenceTranslation(text.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Lookup services
// ---------------------------------------------------------------------------

/// Lowercases and strips a plural `s`; only words marked simple are filtered.
#[derive(Default)]
pub struct FakeVocab {
    simple: Mutex<HashSet<String>>,
}

impl FakeVocab {
    pub fn mark_simple(&self, word: &str) {
        self.simple.lock().unwrap().insert(word.to_string());
    }
}

impl VocabFilter for FakeVocab {
    fn too_simple(&self, word: &str, _level: u32) -> (bool, String) {
        let lower = word.trim().to_lowercase();
        let normalized = match lower.strip_suffix('s') {
            Some(stem) if stem.len() > 3 => stem.to_string(),
            _ => lower,
        };
        let simple = self.simple.lock().unwrap().contains(&normalized);
        (simple, normalized)
    }
}

#[derive(Default)]
pub struct MapCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MapCache {
    pub fn insert(&self, word: &str, text: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(word.to_string(), text.to_string());
    }

    pub fn get(&self, word: &str) -> Option<String> {
        self.entries.lock().unwrap().get(word).cloned()
    }
}

impl TranslationCache for MapCache {
    fn lookup(&self, word: &str) -> Option<String> {
        self.get(word)
    }

    fn store(&self, word: &str, translation: &str) {
        self.insert(word, translation);
    }
}

/// Answers `tr:<word>` with source tag `Fake`.
pub struct FakeTranslator {
    latency: Duration,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<ErrorFactory>>,
}

impl FakeTranslator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with(&self, make: impl Fn() -> FetchError + Send + Sync + 'static) {
        *self.failure.lock().unwrap() = Some(Box::new(make));
    }

    fn failure(&self) -> Option<FetchError> {
        self.failure.lock().unwrap().as_ref().map(|make| make())
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, word: &str) -> Result<Translation, FetchError> {
        self.calls.lock().unwrap().push(word.to_string());
        delay(self.latency).await;
        match self.failure() {
            Some(e) => Err(e),
            None => Ok(Translation {
                text: format!("tr:{word}"),
                source: "Fake".into(),
            }),
        }
    }
}

/// Answers `[<text>]`, or always fails.
pub struct ScriptedSentences {
    latency: Duration,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSentences {
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::ZERO,
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SentenceTranslator for ScriptedSentences {
    async fn translate_sentence(&self, text: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(text.to_string());
        delay(self.latency).await;
        if self.fail {
            Err(FetchError::Status(503))
        } else {
            Ok(format!("[{text}]"))
        }
    }
}

/// Returns `/img/<word>.jpg` from source `Fake`.
pub struct FakeImages {
    latency: Duration,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<ErrorFactory>>,
}

impl FakeImages {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with(&self, make: impl Fn() -> FetchError + Send + Sync + 'static) {
        *self.failure.lock().unwrap() = Some(Box::new(make));
    }
}

#[async_trait]
impl ImageProvider for FakeImages {
    async fn fetch_image(&self, word: &str) -> Result<ImageHit, FetchError> {
        self.calls.lock().unwrap().push(word.to_string());
        delay(self.latency).await;
        if let Some(make) = self.failure.lock().unwrap().as_ref() {
            return Err(make());
        }
        Ok(ImageHit {
            path: PathBuf::from(format!("/img/{word}.jpg")),
            source: "Fake".into(),
        })
    }
}

/// Records `fetch_full` calls; `load_cached` answers for inserted words.
pub struct FakeDictionary {
    latency: Duration,
    cached: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeDictionary {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            cached: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_cached(&self, word: &str) {
        self.cached.lock().unwrap().insert(word.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DictionaryProvider for FakeDictionary {
    fn load_cached(&self, word: &str) -> Option<DictionaryEntry> {
        self.cached
            .lock()
            .unwrap()
            .contains(word)
            .then(|| entry_for(word))
    }

    async fn fetch_full(&self, word: &str) -> Result<DictionaryEntry, FetchError> {
        self.calls.lock().unwrap().push(word.to_string());
        delay(self.latency).await;
        Ok(entry_for(word))
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Reports every file ready once `ready_after` has elapsed since creation.
pub struct FakeAudioStore {
    created: Instant,
    ready_after: Option<Duration>,
}

impl FakeAudioStore {
    pub fn ready_after(after: Duration) -> Arc<Self> {
        Arc::new(Self {
            created: Instant::now(),
            ready_after: Some(after),
        })
    }

    pub fn never_ready() -> Arc<Self> {
        Arc::new(Self {
            created: Instant::now(),
            ready_after: None,
        })
    }
}

impl AudioStore for FakeAudioStore {
    fn probe(&self, _word: &str, _voice: Voice) -> AudioProbe {
        let ready = self
            .ready_after
            .is_some_and(|after| self.created.elapsed() >= after);
        AudioProbe {
            exists: ready,
            size_ok: ready,
        }
    }

    fn cache_path(&self, word: &str, voice: Voice) -> PathBuf {
        PathBuf::from(format!("/audio/{word}-{}.mp3", voice.code()))
    }

    fn tts_url(&self, word: &str, voice: Voice) -> String {
        format!("tts:{word}:{}", voice.code())
    }
}

/// Records what was played.  With a latency, each playback takes that long
/// and the highest number of simultaneous playbacks is tracked.
#[derive(Default)]
pub struct RecordingPlayer {
    fail: AtomicBool,
    latency: Duration,
    playing: AtomicUsize,
    peak: AtomicUsize,
    played: Mutex<Vec<PathBuf>>,
    streamed: Mutex<Vec<String>>,
}

impl RecordingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let player = Self::default();
        player.fail.store(true, Ordering::SeqCst);
        Arc::new(player)
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    pub fn peak_playing(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }

    pub fn streamed(&self) -> Vec<String> {
        self.streamed.lock().unwrap().clone()
    }

    async fn sound(&self) -> Result<(), AudioError> {
        let now = self.playing.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        delay(self.latency).await;
        self.playing.fetch_sub(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(AudioError::Playback("no audio device".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play_from_cache(&self, path: &Path) -> Result<(), AudioError> {
        self.played.lock().unwrap().push(path.to_path_buf());
        self.sound().await
    }

    async fn stream_play_and_cache(&self, url: &str, _path: &Path) -> Result<(), AudioError> {
        self.streamed.lock().unwrap().push(url.to_string());
        self.sound().await
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A full set of doubles plus the pools an orchestrator runs on.
pub struct Fixture {
    pub vocab: Arc<FakeVocab>,
    pub cache: Arc<MapCache>,
    pub translator: Arc<FakeTranslator>,
    pub sentences: Arc<ScriptedSentences>,
    pub images: Arc<FakeImages>,
    pub dictionary: Arc<FakeDictionary>,
    pub store: Arc<FakeAudioStore>,
    pub player: Arc<RecordingPlayer>,
    pub sink: Arc<RecordingSink>,
    pub settings: LiveSettings,
    pub lookups: TaskPool,
    pub audio_pool: TaskPool,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Translator, image and dictionary doubles all take `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            vocab: Arc::new(FakeVocab::default()),
            cache: Arc::new(MapCache::default()),
            translator: Arc::new(FakeTranslator::new(latency)),
            sentences: ScriptedSentences::new(Duration::ZERO),
            images: Arc::new(FakeImages::new(latency)),
            dictionary: Arc::new(FakeDictionary::new(latency)),
            store: FakeAudioStore::ready_after(Duration::ZERO),
            player: RecordingPlayer::new(),
            sink: RecordingSink::new(),
            settings: LiveSettings::default(),
            lookups: TaskPool::new("lookup", 16),
            audio_pool: TaskPool::new("audio", 2),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            vocab: self.vocab.clone(),
            translation_cache: self.cache.clone(),
            translator: self.translator.clone(),
            sentence_translator: self.sentences.clone(),
            images: self.images.clone(),
            dictionary: self.dictionary.clone(),
            audio_store: self.store.clone(),
            audio_player: self.player.clone(),
        }
    }

    pub fn orchestrator(&self) -> WordOrchestrator {
        self.orchestrator_with_sink(self.sink.clone())
    }

    pub fn orchestrator_with_sink(&self, sink: Arc<dyn DisplaySink>) -> WordOrchestrator {
        WordOrchestrator::new(
            self.services(),
            sink,
            self.settings.clone(),
            self.lookups.clone(),
            self.audio_pool.clone(),
            AudioSync::new(
                self.store.clone(),
                self.player.clone(),
                20,
                Duration::from_millis(100),
            ),
            Voice::Us,
        )
    }

    pub async fn wait_idle(&self) {
        for _ in 0..2 {
            self.lookups.wait_idle().await;
            self.audio_pool.wait_idle().await;
        }
    }
}
