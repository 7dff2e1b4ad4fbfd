//! Reactive event-to-task pipeline.
//!
//! Turns the stream of global key events into an edited sentence buffer,
//! word and sentence boundaries, and debounced or throttled background
//! lookups whose results are handed to a [`DisplaySink`](crate::display::DisplaySink).
//!
//! # Architecture
//!
//! ```text
//! KeyboardListener (OS thread)
//!        │ InputEvent (mpsc, blocking_send)
//!        ▼
//! PipelineRunner::run()                      ← one tokio task, sole writer
//!        │                                     of the typing state
//!        ├─ classifier ─▶ LayoutGate ─▶ TypingState ─▶ live text ─▶ sink
//!        │                                   │
//!        │                                   ├─ word ─▶ WordOrchestrator
//!        │                                   │            ├─ translation ┐
//!        │                                   │            ├─ image       ├─▶ TaskPool ─▶ sink(key)
//!        │                                   │            └─ dictionary ─┘      └─▶ AudioSync
//!        │                                   │
//!        │                                   └─ boundary ─▶ SentenceScheduler (debounce)
//!        │                                                        └─▶ TaskPool ─▶ sink
//!        └─ Ctrl+C ─▶ ThrottleWindow ─▶ clipboard word ─▶ WordOrchestrator
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use english_helper::config::{AppConfig, LiveSettings};
//! use english_helper::display::SharedDisplay;
//! use english_helper::input::{FixedLayout, SystemClipboard};
//! use english_helper::pipeline::PipelineRunner;
//! # use english_helper::services::Services;
//! # fn make_services() -> Services { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let display = SharedDisplay::new();
//!     let runner = PipelineRunner::new(
//!         &config.pipeline,
//!         make_services(),
//!         Arc::new(display.clone()),
//!         LiveSettings::new(&config.user),
//!         Box::new(FixedLayout(true)),
//!         Arc::new(SystemClipboard::new(config.pipeline.max_clipboard_word_len)),
//!         Default::default(),
//!     );
//!
//!     let (tx, rx) = mpsc::channel(256);
//!     tokio::spawn(runner.run(rx));
//!     // tx is passed to KeyboardListener::start(...)
//!     # drop(tx);
//! }
//! ```

pub mod classifier;
pub mod orchestrator;
pub mod pronounce;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod tasks;
pub mod text_buffer;

#[cfg(test)]
pub(crate) mod testing;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use classifier::{classify, normalize_char, Action};
pub use orchestrator::WordOrchestrator;
pub use pronounce::{AudioOutcome, AudioSync};
pub use runner::PipelineRunner;
pub use scheduler::{DebounceToken, Debouncer, SentenceScheduler, ThrottleWindow};
pub use state::{Outcome, TypingState};
pub use tasks::TaskPool;
pub use text_buffer::{TextBuffer, CURSOR_MARKER};
