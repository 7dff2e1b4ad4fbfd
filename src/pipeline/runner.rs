//! The event loop: input events in, edits and lookups out.
//!
//! [`PipelineRunner::run`] is the only consumer of the input channel and the
//! only writer of the typing state.  Everything that can block (layout probe
//! aside, which is cached) is handed off to a [`TaskPool`]:
//!
//! ```text
//! InputEvent (mpsc)
//!        │
//!        ▼
//! PipelineRunner::run()  ← single tokio task
//!        │
//!        ├─ Key ──▶ classify ─▶ layout gate ─▶ TypingState::handle
//!        │                                         │
//!        │               live text ◀───────────────┤
//!        │     WordOrchestrator::process_word ◀────┤ completed word
//!        │     SentenceScheduler::request ◀────────┘ boundary
//!        │
//!        ├─ ClipboardCopy ─▶ throttle ─▶ spawn(read word ─▶ process_word)
//!        ├─ Lookup ─▶ WordOrchestrator::lookup (synonym clicks)
//!        ├─ Pronounce ─▶ WordOrchestrator::pronounce_active
//!        │
//!        └─ Shutdown ─▶ cancel debounce, close pools, bounded wait
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::{LiveSettings, PipelineConfig};
use crate::display::DisplaySink;
use crate::input::{ClipboardReader, InputEvent, KeyEvent, LayoutGate, LayoutSource};
use crate::services::{Services, Voice};

use super::classifier::classify;
use super::orchestrator::WordOrchestrator;
use super::pronounce::AudioSync;
use super::scheduler::{SentenceScheduler, ThrottleWindow};
use super::state::TypingState;
use super::tasks::TaskPool;

/// Concurrent word lookups (translation, image, dictionary).
const LOOKUP_TASKS: usize = 16;
/// Concurrent pronunciation requests.
const AUDIO_TASKS: usize = 2;
/// Concurrent sentence timers and their fetches.
const SENTENCE_TASKS: usize = 4;
/// Concurrent clipboard reads.
const CLIPBOARD_TASKS: usize = 2;

/// Owns the typing state and every scheduler of the pipeline.
pub struct PipelineRunner {
    typing: TypingState,
    gate: LayoutGate,
    orchestrator: Arc<WordOrchestrator>,
    sentences: SentenceScheduler,
    sentence_text: watch::Sender<String>,
    clipboard: Arc<dyn ClipboardReader>,
    clipboard_throttle: ThrottleWindow,
    sink: Arc<dyn DisplaySink>,
    clipboard_pool: TaskPool,
    pools: [TaskPool; 4],
    shutdown_grace: Duration,
}

impl PipelineRunner {
    pub fn new(
        config: &PipelineConfig,
        services: Services,
        sink: Arc<dyn DisplaySink>,
        settings: LiveSettings,
        layout: Box<dyn LayoutSource>,
        clipboard: Arc<dyn ClipboardReader>,
        voice: Voice,
    ) -> Self {
        let lookups = TaskPool::new("lookup", LOOKUP_TASKS);
        let audio_pool = TaskPool::new("audio", AUDIO_TASKS);
        let sentence_pool = TaskPool::new("sentence", SENTENCE_TASKS);
        let clipboard_pool = TaskPool::new("clipboard", CLIPBOARD_TASKS);

        let (sentence_text, sentence_rx) = watch::channel(String::new());
        let sentences = SentenceScheduler::new(
            config.sentence_debounce(),
            sentence_pool.clone(),
            sentence_rx,
            Arc::clone(&services.sentence_translator),
            Arc::clone(&sink),
            settings.clone(),
        );
        let audio = AudioSync::new(
            Arc::clone(&services.audio_store),
            Arc::clone(&services.audio_player),
            config.audio_poll_attempts,
            config.audio_poll_interval(),
        );
        let orchestrator = WordOrchestrator::new(
            services,
            Arc::clone(&sink),
            settings,
            lookups.clone(),
            audio_pool.clone(),
            audio,
            voice,
        );

        Self {
            typing: TypingState::new(),
            gate: LayoutGate::new(layout, config.layout_ttl()),
            orchestrator: Arc::new(orchestrator),
            sentences,
            sentence_text,
            clipboard,
            clipboard_throttle: ThrottleWindow::new(config.clipboard_throttle()),
            sink,
            clipboard_pool: clipboard_pool.clone(),
            pools: [lookups, audio_pool, sentence_pool, clipboard_pool],
            shutdown_grace: config.shutdown_grace(),
        }
    }

    /// Consume events until [`InputEvent::Shutdown`] arrives or every sender
    /// is dropped, then shut down.
    pub async fn run(mut self, mut rx: mpsc::Receiver<InputEvent>) {
        log::info!("pipeline: runner started");
        while let Some(event) = rx.recv().await {
            match event {
                InputEvent::Key(key) => self.on_key(&key).await,
                InputEvent::ClipboardCopy => self.on_clipboard(),
                InputEvent::Lookup { word, force } => {
                    self.orchestrator.lookup(&word, force);
                }
                InputEvent::Pronounce(voice) => {
                    self.orchestrator.pronounce_active(voice);
                }
                InputEvent::Shutdown => {
                    log::info!("pipeline: shutdown requested");
                    break;
                }
            }
        }
        self.shutdown().await;
        log::info!("pipeline: runner stopped");
    }

    async fn on_key(&mut self, event: &KeyEvent) {
        let Some(action) = classify(event) else {
            return;
        };
        if !self.gate.is_target_layout().await {
            log::trace!("pipeline: {action:?} ignored, layout is not the target one");
            return;
        }

        let outcome = self.typing.handle(action);
        if outcome.refresh {
            self.sentence_text.send_replace(self.typing.sentence_text());
            self.sink
                .present_live_sentence_text(&self.typing.live_text());
        }
        if let Some(word) = outcome.completed_word {
            self.orchestrator.process_word(&word);
        }
        if outcome.translate {
            self.sentences.request();
        }
    }

    fn on_clipboard(&self) {
        if !self.clipboard_throttle.try_accept() {
            log::debug!("pipeline: clipboard event throttled");
            return;
        }
        let reader = Arc::clone(&self.clipboard);
        let orchestrator = Arc::clone(&self.orchestrator);
        self.clipboard_pool.spawn(async move {
            match reader.read_word().await {
                Ok(Some(word)) => {
                    orchestrator.process_word(&word);
                }
                Ok(None) => log::debug!("pipeline: clipboard holds no single word"),
                Err(e) => log::debug!("pipeline: clipboard read failed: {e}"),
            }
        });
    }

    /// Cancel the debounce timer, close every pool and wait for running tasks
    /// until the grace period runs out.
    async fn shutdown(&self) {
        self.sentences.cancel();
        for pool in &self.pools {
            pool.close();
        }
        let deadline = Instant::now() + self.shutdown_grace;
        for pool in &self.pools {
            let remaining = deadline.saturating_duration_since(Instant::now());
            pool.shutdown(remaining).await;
        }
    }
}
