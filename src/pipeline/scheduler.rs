//! Debounce and throttle primitives, and the sentence-translation scheduler.
//!
//! # Debounce
//!
//! [`Debouncer`] keeps a single mutex-guarded slot holding the pending timer
//! and a generation counter.  Scheduling bumps the generation and replaces the
//! slot; dropping the previous timer's cancel sender wakes it and it exits
//! without running.  Cancellation is only effective while a timer is still in
//! its delay: once it has fired, its job runs to completion, but the job can
//! (and the sentence job does) consult its [`DebounceToken`] to see whether a
//! newer timer superseded it.
//!
//! ```text
//! schedule()  gen=1 ──sleep──╳ (cancelled by gen=2)
//! schedule()  gen=2 ──sleep──────▶ fire ─▶ job(token=2) ─▶ fetch ─▶ token current? present
//! ```
//!
//! # Throttle
//!
//! [`ThrottleWindow`] accepts an event only if the window elapsed since the
//! last *accepted* one, and records the acceptance before any work starts.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

use crate::config::LiveSettings;
use crate::display::{DisplaySink, SENTENCE_PLACEHOLDER, SOURCE_NONE};
use crate::services::SentenceTranslator;

use super::tasks::TaskPool;

// ---------------------------------------------------------------------------
// ThrottleWindow
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ThrottleWindow {
    window: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl ThrottleWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(None),
        }
    }

    pub fn try_accept(&self) -> bool {
        self.try_accept_at(Instant::now())
    }

    /// Accept when `now - last_accepted ≥ window`; on accept `now` becomes
    /// the new reference point.
    pub fn try_accept_at(&self, now: Instant) -> bool {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            if now.saturating_duration_since(prev) < self.window {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingTimer {
    /// Dropping this wakes the timer task, which then exits.
    _cancel: oneshot::Sender<()>,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<PendingTimer>,
}

/// Identifies one scheduled timer.  Stays current until the next
/// [`Debouncer::schedule`] or [`Debouncer::cancel`].
#[derive(Debug, Clone)]
pub struct DebounceToken {
    generation: u64,
    slot: Arc<Mutex<Slot>>,
}

impl DebounceToken {
    pub fn is_current(&self) -> bool {
        lock_slot(&self.slot).generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-flight debounce timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Cancel any pending timer and start a new one that runs `job` on
    /// `pool` after the delay.  Returns the new timer's token.
    pub fn schedule<F, Fut>(&self, pool: &TaskPool, job: F) -> DebounceToken
    where
        F: FnOnce(DebounceToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let deadline = Instant::now() + self.delay;
        let token = {
            let mut slot = lock_slot(&self.slot);
            slot.generation += 1;
            // Replacing the slot drops the previous sender and cancels it.
            slot.pending = Some(PendingTimer {
                _cancel: cancel_tx,
                deadline,
            });
            DebounceToken {
                generation: slot.generation,
                slot: Arc::clone(&self.slot),
            }
        };

        let fire_token = token.clone();
        pool.spawn(async move {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    log::trace!("scheduler: timer {} cancelled", fire_token.generation);
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => {}
            }
            {
                let mut slot = lock_slot(&fire_token.slot);
                if slot.generation != fire_token.generation {
                    return;
                }
                slot.pending = None;
            }
            job(fire_token).await;
        });
        token
    }

    /// Cancel the pending timer, if any, and invalidate every issued token.
    pub fn cancel(&self) {
        let mut slot = lock_slot(&self.slot);
        slot.generation += 1;
        slot.pending = None;
    }

    /// `true` while a timer is waiting for its deadline.
    pub fn is_pending(&self) -> bool {
        lock_slot(&self.slot).pending.is_some()
    }

    /// Deadline of the pending timer.
    pub fn deadline(&self) -> Option<Instant> {
        lock_slot(&self.slot).pending.as_ref().map(|p| p.deadline)
    }
}

// ---------------------------------------------------------------------------
// SentenceScheduler
// ---------------------------------------------------------------------------

/// Debounced translation of the sentence being typed.
///
/// The event path publishes the marker-free buffer text into a `watch`
/// channel after every edit; the timer reads it when it fires, so the text
/// translated is always the text at fire time.
pub struct SentenceScheduler {
    debouncer: Debouncer,
    pool: TaskPool,
    text: watch::Receiver<String>,
    translator: Arc<dyn SentenceTranslator>,
    sink: Arc<dyn DisplaySink>,
    settings: LiveSettings,
}

impl SentenceScheduler {
    pub fn new(
        delay: Duration,
        pool: TaskPool,
        text: watch::Receiver<String>,
        translator: Arc<dyn SentenceTranslator>,
        sink: Arc<dyn DisplaySink>,
        settings: LiveSettings,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
            pool,
            text,
            translator,
            sink,
            settings,
        }
    }

    /// (Re)start the debounce timer.  Ignored while the sentence panel is
    /// hidden.
    pub fn request(&self) {
        if !self.settings.show_sentence_window() {
            return;
        }
        let text = self.text.clone();
        let translator = Arc::clone(&self.translator);
        let sink = Arc::clone(&self.sink);
        self.debouncer.schedule(&self.pool, move |token| async move {
            if !token.is_current() {
                return;
            }
            let sentence = text.borrow().trim().to_string();
            if sentence.is_empty() {
                sink.present_sentence_translation(SENTENCE_PLACEHOLDER);
                return;
            }
            let result = translator.translate_sentence(&sentence).await;
            if !token.is_current() {
                log::debug!("scheduler: dropping superseded sentence translation");
                return;
            }
            match result {
                Ok(translated) => sink.present_sentence_translation(translated.trim()),
                Err(e) => {
                    log::warn!("scheduler: sentence translation failed: {e}");
                    sink.present_sentence_translation(SOURCE_NONE);
                }
            }
        });
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{RecordingSink, ScriptedSentences};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(100);

    // -----------------------------------------------------------------------
    // ThrottleWindow
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn throttle_rejects_within_window() {
        let t = ThrottleWindow::new(Duration::from_millis(500));
        let start = Instant::now();
        assert!(t.try_accept_at(start));
        assert!(!t.try_accept_at(start + Duration::from_millis(100)));
        assert!(!t.try_accept_at(start + Duration::from_millis(499)));
        assert!(t.try_accept_at(start + Duration::from_millis(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_measures_from_acceptance() {
        let t = ThrottleWindow::new(Duration::from_millis(500));
        let start = Instant::now();
        assert!(t.try_accept_at(start));
        // Rejected attempts do not move the reference point.
        assert!(!t.try_accept_at(start + Duration::from_millis(400)));
        assert!(t.try_accept_at(start + Duration::from_millis(500)));
        assert!(!t.try_accept_at(start + Duration::from_millis(900)));
    }

    // -----------------------------------------------------------------------
    // Debouncer
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn only_last_schedule_fires() {
        let pool = TaskPool::new("test", 8);
        let d = Debouncer::new(DELAY);
        let fired = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..5 {
            let fired = fired.clone();
            d.schedule(&pool, move |token| async move {
                fired.lock().unwrap().push(token.generation());
            });
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert!(d.is_pending());
        pool.wait_idle().await;
        assert_eq!(*fired.lock().unwrap(), vec![5]);
        assert!(!d.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let pool = TaskPool::new("test", 8);
        let d = Debouncer::new(DELAY);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let start = Instant::now();
        d.schedule(&pool, move |_| async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(d.deadline(), Some(start + DELAY));
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        pool.wait_idle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_timer() {
        let pool = TaskPool::new("test", 8);
        let d = Debouncer::new(DELAY);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let token = d.schedule(&pool, move |_| async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        d.cancel();
        assert!(!token.is_current());
        pool.wait_idle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_job_sees_supersession() {
        let pool = TaskPool::new("test", 8);
        let d = Debouncer::new(DELAY);
        let observed = Arc::new(Mutex::new(None));
        let o = observed.clone();
        d.schedule(&pool, move |token| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            *o.lock().unwrap() = Some(token.is_current());
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        // First job is in flight now; a new schedule must not abort it.
        d.schedule(&pool, |_| async {});
        pool.wait_idle().await;
        assert_eq!(*observed.lock().unwrap(), Some(false));
    }

    // -----------------------------------------------------------------------
    // SentenceScheduler
    // -----------------------------------------------------------------------

    fn scheduler(
        translator: Arc<ScriptedSentences>,
        sink: Arc<RecordingSink>,
    ) -> (SentenceScheduler, watch::Sender<String>, TaskPool) {
        let pool = TaskPool::new("sentence", 4);
        let (tx, rx) = watch::channel(String::new());
        let s = SentenceScheduler::new(
            DELAY,
            pool.clone(),
            rx,
            translator,
            sink,
            LiveSettings::default(),
        );
        (s, tx, pool)
    }

    /// "a b c " typed quickly: one fetch, with the text at fire time.
    #[tokio::test(start_paused = true)]
    async fn rapid_boundaries_collapse_into_one_fetch() {
        let translator = ScriptedSentences::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let (s, tx, pool) = scheduler(translator.clone(), sink.clone());

        for text in ["a ", "a b ", "a b c "] {
            tx.send_replace(text.to_string());
            s.request();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.wait_idle().await;

        assert_eq!(translator.calls(), vec!["a b c".to_string()]);
        assert_eq!(sink.sentence_translations(), vec!["[a b c]".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_buffer_presents_placeholder() {
        let translator = ScriptedSentences::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let (s, tx, pool) = scheduler(translator.clone(), sink.clone());
        tx.send_replace("   ".into());
        s.request();
        pool.wait_idle().await;
        assert!(translator.calls().is_empty());
        assert_eq!(sink.sentence_translations(), vec![SENTENCE_PLACEHOLDER.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_result_is_discarded_when_superseded() {
        let translator = ScriptedSentences::new(Duration::from_millis(300));
        let sink = RecordingSink::new();
        let (s, tx, pool) = scheduler(translator.clone(), sink.clone());

        tx.send_replace("first".into());
        s.request();
        // Fires at 100 ms; the fetch is in flight until 400 ms.
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send_replace("first second".into());
        s.request();
        pool.wait_idle().await;

        assert_eq!(translator.calls(), vec!["first", "first second"]);
        assert_eq!(sink.sentence_translations(), vec!["[first second]".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_presents_dash() {
        let translator = ScriptedSentences::failing();
        let sink = RecordingSink::new();
        let (s, tx, pool) = scheduler(translator, sink.clone());
        tx.send_replace("hello".into());
        s.request();
        pool.wait_idle().await;
        assert_eq!(sink.sentence_translations(), vec![SOURCE_NONE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_panel_skips_requests() {
        let translator = ScriptedSentences::new(Duration::ZERO);
        let sink = RecordingSink::new();
        let (s, tx, pool) = scheduler(translator.clone(), sink.clone());
        s.settings.set_show_sentence_window(false);
        tx.send_replace("hello".into());
        s.request();
        assert!(!s.is_pending());
        pool.wait_idle().await;
        assert!(translator.calls().is_empty());
    }
}
