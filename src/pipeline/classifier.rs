//! Key event classification.
//!
//! The listener reports the text a key produced in the *active* layout.  When
//! the user types English with the Russian layout still active (or the OS
//! reports the Cyrillic character for a physical QWERTY key), the character is
//! mapped back to the Latin character on the same physical key before
//! classification.

use crate::input::{KeyEvent, KeyPhase, KeySymbol};

/// ЙЦУКЕН characters, in the order of [`LATIN_SAME_KEY`].
const CYRILLIC_KEYS: &str = "йцукенгшщзхъфывапролджэячсмитьбю";
/// The QWERTY character on the same physical key as each [`CYRILLIC_KEYS`]
/// entry.
const LATIN_SAME_KEY: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,.";

/// What a key means to the typing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// ASCII letter.
    Letter(char),
    /// `.`, `,`, `!` or `?`.  `sentence_end` for the terminal ones.
    Delimiter { ch: char, sentence_end: bool },
    /// Any other printable character.
    Symbol(char),
    Space,
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
}

impl Action {
    /// Character the action inserts into the buffer, if any.
    pub fn printable(self) -> Option<char> {
        match self {
            Action::Letter(c) | Action::Symbol(c) | Action::Delimiter { ch: c, .. } => Some(c),
            _ => None,
        }
    }
}

/// Map a Cyrillic character to the Latin one on the same physical key.
/// Letters keep their case; other characters pass through unchanged.
pub fn normalize_char(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let Some(idx) = CYRILLIC_KEYS.chars().position(|k| k == lower) else {
        return c;
    };
    let Some(mapped) = LATIN_SAME_KEY.chars().nth(idx) else {
        return c;
    };
    if c != lower && mapped.is_ascii_alphabetic() {
        mapped.to_ascii_uppercase()
    } else {
        mapped
    }
}

/// Classify a single character.
pub fn classify_char(c: char) -> Option<Action> {
    Some(match c {
        ' ' => Action::Space,
        '\n' | '\r' => Action::Enter,
        '.' | '!' | '?' => Action::Delimiter {
            ch: c,
            sentence_end: true,
        },
        ',' => Action::Delimiter {
            ch: c,
            sentence_end: false,
        },
        c if c.is_ascii_alphabetic() => Action::Letter(c),
        c if !c.is_control() && !c.is_whitespace() => Action::Symbol(c),
        _ => return None,
    })
}

/// Classify a key event.  `None` for key-down events, events with Ctrl or Alt
/// held and keys with no meaning to the pipeline.  Layout gating happens
/// before this is called.
pub fn classify(event: &KeyEvent) -> Option<Action> {
    if event.phase != KeyPhase::Up || event.ctrl || event.alt {
        return None;
    }
    match &event.symbol {
        KeySymbol::Space => Some(Action::Space),
        KeySymbol::Enter => Some(Action::Enter),
        KeySymbol::Backspace => Some(Action::Backspace),
        KeySymbol::Delete => Some(Action::Delete),
        KeySymbol::Left => Some(Action::Left),
        KeySymbol::Right => Some(Action::Right),
        KeySymbol::Text(text) => {
            let mut chars = text.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            classify_char(normalize_char(c))
        }
        KeySymbol::Other => None,
    }
}
