//! English Helper: a live typing assistant for English learners.
//!
//! Watches what the user types system-wide, mirrors the sentence being
//! typed, and for every non-trivial completed word shows its translation,
//! dictionary entry, an illustrative image and plays its pronunciation.
//!
//! * [`pipeline`]: the event-to-task core.
//! * [`input`]: keyboard hook, clipboard and layout probes.
//! * [`services`]: lookup adapters and on-disk caches.
//! * [`display`]: result presentation contract and shared state.
//! * [`config`]: settings, paths and live-adjustable values.
//! * [`app`]: the egui companion window.

pub mod app;
pub mod config;
pub mod display;
pub mod input;
pub mod pipeline;
pub mod services;
