//! Pronunciation playback synchronized with the dictionary download.
//!
//! The dictionary task downloads the pronunciation file as a side effect, so
//! by the time the user wants to hear the word the file is usually on its way.
//! [`AudioSync::pronounce`] polls the cache for a bounded number of attempts
//! and plays the file once it is complete; if it never becomes ready it
//! streams the audio directly (caching it as it goes) exactly once.
//!
//! Playback is serialized: a second request waits for the first to finish
//! and checks again whether it is still wanted before it plays.
//!
//! ```text
//! poll 1 ─ poll 2 ─ … ─ ready? ──▶ play_from_cache
//!                          │
//!                 attempts exhausted ──▶ stream_play_and_cache
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::services::{AudioPlayer, AudioStore, Voice};

/// How one pronunciation request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutcome {
    /// The cached file became ready after `attempts` polls and was played.
    PlayedFromCache { attempts: u32 },
    /// The cache never became ready; the audio was streamed.
    Streamed,
    /// A newer word became current before anything was played.
    Abandoned,
    /// Playback or streaming failed; already logged.
    Failed,
}

/// Polls an [`AudioStore`] and plays through an [`AudioPlayer`].
pub struct AudioSync {
    store: Arc<dyn AudioStore>,
    player: Arc<dyn AudioPlayer>,
    attempts: u32,
    interval: Duration,
    /// Held for the whole of one playback or stream.
    playback: Mutex<()>,
}

impl AudioSync {
    pub fn new(
        store: Arc<dyn AudioStore>,
        player: Arc<dyn AudioPlayer>,
        attempts: u32,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            player,
            attempts: attempts.max(1),
            interval,
            playback: Mutex::new(()),
        }
    }

    /// Play `word` once its cached file is complete, or stream it after the
    /// polling bound.  `still_wanted` is consulted before every poll and
    /// again once the playback lock is held; once it returns `false` nothing
    /// is played.
    pub async fn pronounce<W>(&self, word: &str, voice: Voice, still_wanted: W) -> AudioOutcome
    where
        W: Fn() -> bool,
    {
        for attempt in 1..=self.attempts {
            if !still_wanted() {
                return AudioOutcome::Abandoned;
            }
            if self.store.probe(word, voice).is_ready() {
                let path = self.store.cache_path(word, voice);
                log::debug!("audio: '{word}' ready after {attempt} poll(s)");
                let _playing = self.playback.lock().await;
                if !still_wanted() {
                    return AudioOutcome::Abandoned;
                }
                return match self.player.play_from_cache(&path).await {
                    Ok(()) => AudioOutcome::PlayedFromCache { attempts: attempt },
                    Err(e) => {
                        log::warn!("audio: playing {} failed: {e}", path.display());
                        AudioOutcome::Failed
                    }
                };
            }
            tokio::time::sleep(self.interval).await;
        }

        if !still_wanted() {
            return AudioOutcome::Abandoned;
        }
        log::debug!(
            "audio: '{word}' not cached after {} poll(s), streaming",
            self.attempts
        );
        let url = self.store.tts_url(word, voice);
        let path = self.store.cache_path(word, voice);
        let _playing = self.playback.lock().await;
        if !still_wanted() {
            return AudioOutcome::Abandoned;
        }
        match self.player.stream_play_and_cache(&url, &path).await {
            Ok(()) => AudioOutcome::Streamed,
            Err(e) => {
                log::warn!("audio: streaming '{word}' failed: {e}");
                AudioOutcome::Failed
            }
        }
    }
}
