//! Per-word dispatch of lookups.
//!
//! For every completed word the orchestrator decides whether anything should
//! happen at all (vocabulary filter, same-word suppression), establishes a new
//! [`WordKey`] on the display and then fans out independent tasks:
//!
//! ```text
//! process_word("Running")
//!   ├─ too_simple? ──────────────▶ stop
//!   ├─ "run" in flight already? ─▶ stop
//!   ├─ present_word_reset(run#7)
//!   ├─ translation cache hit? ───▶ present Cached           (event path)
//!   │        miss ───────────────▶ spawn translate ─▶ store ─▶ present
//!   ├─ spawn image ──────────────▶ present
//!   └─ spawn dictionary
//!        ├─ auto-pronounce? ─────▶ spawn AudioSync::pronounce
//!        └─ cached or fetch_full ▶ present
//! ```
//!
//! Results carry the key they were computed for; stale ones are dropped by the
//! sink, never here.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::LiveSettings;
use crate::display::{DisplaySink, FetchResult, WordKey, SOURCE_CACHE, SOURCE_NONE};
use crate::services::{FetchError, Services, Voice};

use super::pronounce::AudioSync;
use super::tasks::TaskPool;

/// The active word and how many of its tasks are still running.
#[derive(Debug, Default)]
struct Current {
    key: Option<WordKey>,
    in_flight: usize,
    next_generation: u64,
}

fn lock_current(current: &Mutex<Current>) -> MutexGuard<'_, Current> {
    current.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_active(current: &Mutex<Current>, key: &WordKey) -> bool {
    lock_current(current).key.as_ref() == Some(key)
}

/// Decrements the in-flight count of its key, unless the key was superseded
/// (a reset starts counting from zero).
struct InFlight {
    current: Arc<Mutex<Current>>,
    key: WordKey,
}

impl InFlight {
    fn start(current: &Arc<Mutex<Current>>, key: &WordKey) -> Self {
        let mut cur = lock_current(current);
        if cur.key.as_ref() == Some(key) {
            cur.in_flight += 1;
        }
        Self {
            current: Arc::clone(current),
            key: key.clone(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut cur = lock_current(&self.current);
        if cur.key.as_ref() == Some(&self.key) {
            cur.in_flight = cur.in_flight.saturating_sub(1);
        }
    }
}

/// Maps a lookup error onto what the display shows.
fn failed<T>(what: &str, word: &str, e: FetchError) -> FetchResult<T> {
    match e {
        FetchError::NotFound => FetchResult::Absent,
        e => {
            log::warn!("orchestrator: {what} for '{word}' failed: {e}");
            FetchResult::Error(e.to_string())
        }
    }
}

pub struct WordOrchestrator {
    services: Services,
    sink: Arc<dyn DisplaySink>,
    settings: LiveSettings,
    lookups: TaskPool,
    audio_pool: TaskPool,
    audio: Arc<AudioSync>,
    voice: Voice,
    current: Arc<Mutex<Current>>,
}

impl WordOrchestrator {
    pub fn new(
        services: Services,
        sink: Arc<dyn DisplaySink>,
        settings: LiveSettings,
        lookups: TaskPool,
        audio_pool: TaskPool,
        audio: AudioSync,
        voice: Voice,
    ) -> Self {
        Self {
            services,
            sink,
            settings,
            lookups,
            audio_pool,
            audio: Arc::new(audio),
            voice,
            current: Arc::new(Mutex::new(Current::default())),
        }
    }

    /// The key of the word currently shown.
    pub fn active_key(&self) -> Option<WordKey> {
        lock_current(&self.current).key.clone()
    }

    /// Lookup tasks of the active word that have not finished yet.
    pub fn in_flight(&self) -> usize {
        lock_current(&self.current).in_flight
    }

    /// Start the lookups for a completed word.  Returns the new key, or
    /// `None` when the word was filtered or is already being looked up.
    pub fn process_word(&self, word: &str) -> Option<WordKey> {
        self.lookup(word, false)
    }

    /// Like [`process_word`](Self::process_word); with `force` the
    /// vocabulary level is ignored (the word is still normalized).
    pub fn lookup(&self, word: &str, force: bool) -> Option<WordKey> {
        let level = self.settings.vocab_level();
        let (too_simple, normalized) = self.services.vocab.too_simple(word, level);
        if too_simple && !force {
            log::debug!("orchestrator: '{word}' is below level {level}, skipped");
            return None;
        }
        if normalized.is_empty() {
            return None;
        }

        let key = {
            let mut cur = lock_current(&self.current);
            let same_word = cur.key.as_ref().is_some_and(|k| k.word() == normalized);
            if same_word && cur.in_flight > 0 {
                log::debug!("orchestrator: '{normalized}' already in flight");
                return None;
            }
            cur.next_generation += 1;
            let key = WordKey::new(normalized, cur.next_generation);
            cur.key = Some(key.clone());
            cur.in_flight = 0;
            // Reset under the lock so concurrent callers reach the sink in
            // the same order they claimed their keys.
            self.sink.present_word_reset(&key);
            key
        };
        log::info!("orchestrator: looking up {key}");

        match self.services.translation_cache.lookup(key.word()) {
            Some(text) => {
                self.sink
                    .present_translation(&key, FetchResult::Cached(text), SOURCE_CACHE);
            }
            None => self.spawn_translation(&key),
        }
        self.spawn_image(&key);
        self.spawn_dictionary(&key);
        Some(key)
    }

    fn spawn_translation(&self, key: &WordKey) {
        let guard = InFlight::start(&self.current, key);
        let key = key.clone();
        let translator = Arc::clone(&self.services.translator);
        let cache = Arc::clone(&self.services.translation_cache);
        let sink = Arc::clone(&self.sink);
        self.lookups.spawn(async move {
            let _guard = guard;
            match translator.translate(key.word()).await {
                Ok(t) => {
                    if !t.text.trim().is_empty() {
                        cache.store(key.word(), &t.text);
                    }
                    sink.present_translation(&key, FetchResult::Fetched(t.text), &t.source);
                }
                Err(e) => {
                    let result = failed("translation", key.word(), e);
                    sink.present_translation(&key, result, SOURCE_NONE);
                }
            }
        });
    }

    fn spawn_image(&self, key: &WordKey) {
        let guard = InFlight::start(&self.current, key);
        let key = key.clone();
        let images = Arc::clone(&self.services.images);
        let sink = Arc::clone(&self.sink);
        self.lookups.spawn(async move {
            let _guard = guard;
            let result = match images.fetch_image(key.word()).await {
                Ok(hit) if hit.source == SOURCE_CACHE => FetchResult::Cached(hit),
                Ok(hit) => FetchResult::Fetched(hit),
                Err(e) => failed("image", key.word(), e),
            };
            sink.present_image(&key, result);
        });
    }

    fn spawn_dictionary(&self, key: &WordKey) {
        let guard = InFlight::start(&self.current, key);
        if self.settings.auto_pronounce() {
            self.spawn_pronunciation(key, self.voice);
        }
        let key = key.clone();
        let dictionary = Arc::clone(&self.services.dictionary);
        let sink = Arc::clone(&self.sink);
        self.lookups.spawn(async move {
            let _guard = guard;
            let result = match dictionary.load_cached(key.word()) {
                Some(entry) if entry.is_empty() => FetchResult::Absent,
                Some(entry) => FetchResult::Cached(entry),
                None => match dictionary.fetch_full(key.word()).await {
                    Ok(entry) if entry.is_empty() => FetchResult::Absent,
                    Ok(entry) => FetchResult::Fetched(entry),
                    Err(e) => failed("dictionary", key.word(), e),
                },
            };
            sink.present_dictionary(&key, result);
        });
    }

    /// Pronounce the active word in `voice`.  Returns its key, or `None`
    /// when no word is shown.
    pub fn pronounce_active(&self, voice: Voice) -> Option<WordKey> {
        let key = self.active_key()?;
        log::debug!("orchestrator: pronouncing {key} ({voice})");
        self.spawn_pronunciation(&key, voice);
        Some(key)
    }

    fn spawn_pronunciation(&self, key: &WordKey, voice: Voice) {
        let key = key.clone();
        let audio = Arc::clone(&self.audio);
        let current = Arc::clone(&self.current);
        self.audio_pool.spawn(async move {
            let outcome = audio
                .pronounce(key.word(), voice, || is_active(&current, &key))
                .await;
            log::debug!("orchestrator: pronunciation of {key}: {outcome:?}");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{SharedDisplay, TranslationView};
    use crate::pipeline::testing::{Fixture, RecordingPlayer, SinkCall};
    use std::path::PathBuf;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn too_simple_word_does_nothing() {
        let fx = Fixture::new();
        fx.vocab.mark_simple("the");
        let orch = fx.orchestrator();

        assert!(orch.process_word("the").is_none());
        fx.wait_idle().await;

        assert!(fx.sink.calls().is_empty());
        assert!(fx.translator.calls().is_empty());
        assert!(fx.images.calls().is_empty());
        assert!(fx.dictionary.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hit_presents_cache_tag_without_translating() {
        let fx = Fixture::new();
        fx.cache.insert("serendipity", "интуитивная прозорливость");
        let orch = fx.orchestrator();

        let key = orch.process_word("serendipity").unwrap();
        fx.wait_idle().await;

        let calls = fx.sink.calls();
        assert_eq!(calls[0], SinkCall::Reset(key.clone()));
        assert!(calls.contains(&SinkCall::Translation {
            key: key.clone(),
            result: FetchResult::Cached("интуитивная прозорливость".into()),
            source: SOURCE_CACHE.into(),
        }));
        assert!(fx.translator.calls().is_empty());
        assert_eq!(fx.images.calls(), vec!["serendipity"]);
        assert_eq!(fx.dictionary.calls(), vec!["serendipity"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_miss_translates_once_and_stores() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();

        let key = orch.process_word("meadow").unwrap();
        fx.wait_idle().await;

        assert_eq!(fx.translator.calls(), vec!["meadow"]);
        assert_eq!(fx.cache.get("meadow").as_deref(), Some("tr:meadow"));
        assert!(fx.sink.calls().contains(&SinkCall::Translation {
            key,
            result: FetchResult::Fetched("tr:meadow".into()),
            source: "Fake".into(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_precedes_every_result() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        let key = orch.process_word("meadow").unwrap();
        fx.wait_idle().await;

        let calls = fx.sink.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], SinkCall::Reset(key.clone()));
        assert!(calls[1..].iter().all(|c| c.key() == Some(&key)));
    }

    #[tokio::test(start_paused = true)]
    async fn same_word_in_flight_is_suppressed() {
        let fx = Fixture::with_latency(Duration::from_millis(300));
        let orch = fx.orchestrator();

        let first = orch.process_word("meadow").unwrap();
        assert!(orch.in_flight() > 0);
        assert!(orch.process_word("meadow").is_none());
        fx.wait_idle().await;
        assert_eq!(fx.translator.calls(), vec!["meadow"]);
        assert_eq!(orch.in_flight(), 0);

        // Once finished, retyping the word looks it up again.
        let second = orch.process_word("meadow").unwrap();
        assert_ne!(first, second);
        fx.wait_idle().await;
        assert_eq!(fx.dictionary.calls(), vec!["meadow", "meadow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn normalized_word_is_looked_up() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        let key = orch.process_word("Meadows").unwrap();
        assert_eq!(key.word(), "meadow");
        fx.wait_idle().await;
        assert_eq!(fx.images.calls(), vec!["meadow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_results_of_superseded_word_are_rejected() {
        let fx = Fixture::with_latency(Duration::from_millis(300));
        let display = Arc::new(SharedDisplay::new());
        let orch = fx.orchestrator_with_sink(display.clone());

        orch.process_word("apple").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let pear = orch.process_word("pear").unwrap();
        fx.wait_idle().await;

        let st = display.lock();
        assert_eq!(st.active.as_ref(), Some(&pear));
        assert_eq!(st.view.word, "pear");
        assert_eq!(st.view.translation, TranslationView::Found("tr:pear".into()));
        assert_eq!(st.stale_dropped, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_map_to_display_results() {
        let fx = Fixture::new();
        fx.translator.fail_with(|| FetchError::Timeout);
        fx.images.fail_with(|| FetchError::NotFound);
        let orch = fx.orchestrator();
        let key = orch.process_word("meadow").unwrap();
        fx.wait_idle().await;

        let calls = fx.sink.calls();
        assert!(calls.contains(&SinkCall::Translation {
            key: key.clone(),
            result: FetchResult::Error(FetchError::Timeout.to_string()),
            source: SOURCE_NONE.into(),
        }));
        assert!(calls.contains(&SinkCall::Image {
            key: key.clone(),
            result: FetchResult::Absent,
        }));
        assert!(fx.cache.get("meadow").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dictionary_cache_hit_skips_fetch() {
        let fx = Fixture::new();
        fx.dictionary.insert_cached("meadow");
        let orch = fx.orchestrator();
        let key = orch.process_word("meadow").unwrap();
        fx.wait_idle().await;

        assert!(fx.dictionary.calls().is_empty());
        assert!(fx
            .sink
            .calls()
            .iter()
            .any(|c| matches!(c, SinkCall::Dictionary { key: k, cached: true } if *k == key)));
    }

    #[tokio::test(start_paused = true)]
    async fn forced_lookup_ignores_level_but_normalizes() {
        let fx = Fixture::new();
        fx.vocab.mark_simple("house");
        let orch = fx.orchestrator();

        assert!(orch.process_word("Houses").is_none());
        let key = orch.lookup("Houses", true).unwrap();
        assert_eq!(key.word(), "house");
        fx.wait_idle().await;

        let calls = fx.sink.calls();
        assert_eq!(calls[0], SinkCall::Reset(key.clone()));
        assert_eq!(fx.translator.calls(), vec!["house"]);
        assert_eq!(fx.images.calls(), vec!["house"]);
        assert_eq!(fx.dictionary.calls(), vec!["house"]);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_words_do_not_play_over_each_other() {
        let mut fx = Fixture::new();
        fx.player = RecordingPlayer::with_latency(Duration::from_millis(800));
        let orch = fx.orchestrator();

        orch.process_word("apple").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        orch.process_word("pear").unwrap();
        fx.wait_idle().await;

        assert_eq!(fx.player.peak_playing(), 1);
        assert_eq!(fx.player.played().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn active_word_can_be_replayed_in_either_voice() {
        let fx = Fixture::new();
        fx.settings.set_auto_pronounce(false);
        let orch = fx.orchestrator();
        assert!(orch.pronounce_active(Voice::Uk).is_none());

        let key = orch.process_word("meadow").unwrap();
        fx.wait_idle().await;
        assert!(fx.player.played().is_empty());

        assert_eq!(orch.pronounce_active(Voice::Uk), Some(key.clone()));
        fx.wait_idle().await;
        assert_eq!(orch.pronounce_active(Voice::Us), Some(key));
        fx.wait_idle().await;
        assert_eq!(
            fx.player.played(),
            vec![
                PathBuf::from("/audio/meadow-uk.mp3"),
                PathBuf::from("/audio/meadow-us.mp3"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn auto_pronounce_plays_once() {
        let fx = Fixture::new();
        let orch = fx.orchestrator();
        orch.process_word("meadow").unwrap();
        fx.wait_idle().await;
        assert_eq!(fx.player.played().len(), 1);

        fx.settings.set_auto_pronounce(false);
        orch.process_word("valley").unwrap();
        fx.wait_idle().await;
        assert_eq!(fx.player.played().len(), 1);
    }
}
