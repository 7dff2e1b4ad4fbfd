//! Dedicated OS-thread keyboard listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyboardListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! `rdev` reports the produced text (`event.name`) only on key press, while
//! the pipeline reacts to key release.  [`KeyTracker`] remembers the text per
//! physical key between the two and also tracks Ctrl/Alt/Shift.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself stays
//! blocked in the rdev event loop until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rdev::{EventType, Key};
use tokio::sync::mpsc;

use super::{InputEvent, KeyEvent, KeyPhase, KeySymbol};

// ---------------------------------------------------------------------------
// KeyTracker
// ---------------------------------------------------------------------------

/// Turns raw `rdev` events into [`InputEvent`]s.
#[derive(Debug, Default)]
struct KeyTracker {
    ctrl_left: bool,
    ctrl_right: bool,
    alt: bool,
    shift_left: bool,
    shift_right: bool,
    /// Text seen on press, per key, waiting for the release.
    pending_names: Vec<(Key, String)>,
}

impl KeyTracker {
    fn ctrl(&self) -> bool {
        self.ctrl_left || self.ctrl_right
    }

    fn shift(&self) -> bool {
        self.shift_left || self.shift_right
    }

    fn set_modifier(&mut self, key: Key, down: bool) -> bool {
        match key {
            Key::ControlLeft => self.ctrl_left = down,
            Key::ControlRight => self.ctrl_right = down,
            Key::Alt | Key::AltGr => self.alt = down,
            Key::ShiftLeft => self.shift_left = down,
            Key::ShiftRight => self.shift_right = down,
            _ => return false,
        }
        true
    }

    fn remember_name(&mut self, key: Key, name: String) {
        match self.pending_names.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = name,
            None => self.pending_names.push((key, name)),
        }
    }

    fn take_name(&mut self, key: Key) -> Option<String> {
        let idx = self.pending_names.iter().position(|(k, _)| *k == key)?;
        Some(self.pending_names.swap_remove(idx).1)
    }

    fn key_event(&self, symbol: KeySymbol, phase: KeyPhase) -> InputEvent {
        InputEvent::Key(KeyEvent {
            symbol,
            phase,
            ctrl: self.ctrl(),
            alt: self.alt,
            shift: self.shift(),
        })
    }

    /// Zero, one or two events for one raw event.
    fn handle(&mut self, event: &rdev::Event) -> Vec<InputEvent> {
        match event.event_type {
            EventType::KeyPress(key) => {
                if self.set_modifier(key, true) {
                    return Vec::new();
                }
                let mut out = Vec::with_capacity(2);
                if key == Key::KeyC && self.ctrl() {
                    out.push(InputEvent::ClipboardCopy);
                }
                let symbol = match special_symbol(key) {
                    Some(symbol) => symbol,
                    None => match printable(event.name.as_deref()) {
                        Some(text) => {
                            self.remember_name(key, text.clone());
                            KeySymbol::Text(text)
                        }
                        None => KeySymbol::Other,
                    },
                };
                out.push(self.key_event(symbol, KeyPhase::Down));
                out
            }
            EventType::KeyRelease(key) => {
                if self.set_modifier(key, false) {
                    return Vec::new();
                }
                let symbol = special_symbol(key)
                    .or_else(|| self.take_name(key).map(KeySymbol::Text))
                    .unwrap_or(KeySymbol::Other);
                vec![self.key_event(symbol, KeyPhase::Up)]
            }
            _ => Vec::new(),
        }
    }
}

/// Editing and navigation keys, recognised by physical key.
fn special_symbol(key: Key) -> Option<KeySymbol> {
    Some(match key {
        Key::Space => KeySymbol::Space,
        Key::Return | Key::KpReturn => KeySymbol::Enter,
        Key::Backspace => KeySymbol::Backspace,
        Key::Delete => KeySymbol::Delete,
        Key::LeftArrow => KeySymbol::Left,
        Key::RightArrow => KeySymbol::Right,
        _ => return None,
    })
}

/// The key's text, if it is a single printable character.
fn printable(name: Option<&str>) -> Option<String> {
    let name = name?;
    let mut chars = name.chars();
    let c = chars.next()?;
    (chars.next().is_none() && !c.is_control()).then(|| name.to_string())
}

// ---------------------------------------------------------------------------
// KeyboardListener
// ---------------------------------------------------------------------------

/// Handle to a running keyboard listener thread.
///
/// Construct one with [`KeyboardListener::start`].  Drop it to stop
/// forwarding events.
pub struct KeyboardListener {
    /// Shared stop flag, set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyboardListener {
    /// Spawn the listener thread.  Events go to `tx` through
    /// `blocking_send`, so a full channel applies back-pressure to the hook
    /// thread instead of dropping keys.
    pub fn start(tx: mpsc::Sender<InputEvent>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("keyboard-listener".into())
            .spawn(move || {
                let mut tracker = KeyTracker::default();
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }
                    for input in tracker.handle(&event) {
                        if tx.blocking_send(input).is_err() {
                            stop_clone.store(true, Ordering::Relaxed);
                            log::debug!("input: pipeline channel closed, listener idle");
                            return;
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("input: rdev::listen exited with error: {:?}", e);
                }
            })?;

        log::info!("input: keyboard listener started");
        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for KeyboardListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn press(key: Key, name: Option<&str>) -> rdev::Event {
        rdev::Event {
            time: SystemTime::now(),
            name: name.map(str::to_string),
            event_type: EventType::KeyPress(key),
        }
    }

    fn release(key: Key) -> rdev::Event {
        rdev::Event {
            time: SystemTime::now(),
            name: None,
            event_type: EventType::KeyRelease(key),
        }
    }

    fn only_key(events: Vec<InputEvent>) -> KeyEvent {
        assert_eq!(events.len(), 1, "{events:?}");
        match events.into_iter().next() {
            Some(InputEvent::Key(k)) => k,
            other => panic!("expected key event, got {other:?}"),
        }
    }

    #[test]
    fn release_carries_text_seen_on_press() {
        let mut t = KeyTracker::default();
        let down = only_key(t.handle(&press(Key::KeyA, Some("ф"))));
        assert_eq!(down.phase, KeyPhase::Down);
        let up = only_key(t.handle(&release(Key::KeyA)));
        assert_eq!(up.symbol, KeySymbol::Text("ф".into()));
        assert_eq!(up.phase, KeyPhase::Up);
        // The name is consumed by the release.
        let again = only_key(t.handle(&release(Key::KeyA)));
        assert_eq!(again.symbol, KeySymbol::Other);
    }

    #[test]
    fn editing_keys_map_by_physical_key() {
        let mut t = KeyTracker::default();
        t.handle(&press(Key::Backspace, Some("\u{8}")));
        assert_eq!(only_key(t.handle(&release(Key::Backspace))).symbol, KeySymbol::Backspace);
        assert_eq!(only_key(t.handle(&release(Key::Return))).symbol, KeySymbol::Enter);
        assert_eq!(only_key(t.handle(&release(Key::Space))).symbol, KeySymbol::Space);
        assert_eq!(only_key(t.handle(&release(Key::LeftArrow))).symbol, KeySymbol::Left);
    }

    #[test]
    fn modifiers_are_tracked_and_not_forwarded() {
        let mut t = KeyTracker::default();
        assert!(t.handle(&press(Key::ShiftLeft, None)).is_empty());
        t.handle(&press(Key::KeyH, Some("H")));
        let up = only_key(t.handle(&release(Key::KeyH)));
        assert!(up.shift && !up.ctrl && !up.alt);
        assert!(t.handle(&release(Key::ShiftLeft)).is_empty());
        t.handle(&press(Key::KeyH, Some("h")));
        assert!(!only_key(t.handle(&release(Key::KeyH))).shift);
    }

    #[test]
    fn ctrl_c_emits_clipboard_copy() {
        let mut t = KeyTracker::default();
        t.handle(&press(Key::ControlLeft, None));
        let events = t.handle(&press(Key::KeyC, Some("\u{3}")));
        assert_eq!(events[0], InputEvent::ClipboardCopy);
        let up = only_key(t.handle(&release(Key::KeyC)));
        assert!(up.ctrl);
        assert_eq!(up.symbol, KeySymbol::Other);
    }

    #[test]
    fn plain_c_is_text() {
        let mut t = KeyTracker::default();
        let events = t.handle(&press(Key::KeyC, Some("c")));
        assert!(!events.contains(&InputEvent::ClipboardCopy));
    }

    #[test]
    fn printable_filter() {
        assert_eq!(printable(Some("a")), Some("a".into()));
        assert_eq!(printable(Some("\u{1b}")), None);
        assert_eq!(printable(Some("ab")), None);
        assert_eq!(printable(None), None);
    }
}
