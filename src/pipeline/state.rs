//! Typing state owned by the event path.
//!
//! [`TypingState`] is the single writer of the [`TextBuffer`], the
//! [`WordAccumulator`] and the [`SentenceState`].  It turns one classified
//! [`Action`] into buffer edits plus an [`Outcome`] telling the runner what to
//! schedule:
//!
//! ```text
//! Letter      ─▶ insert, word += c                         refresh
//! , . ! ?     ─▶ insert, flush word                        refresh, translate
//!                (. ! ? also mark the sentence finished)
//! Symbol      ─▶ insert                                    refresh
//! Space/Enter ─▶ insert ' ' / '\n', flush word             refresh, translate
//!                (Enter marks the sentence finished)
//! Backspace   ─▶ remove before cursor, word.pop, unfinish  refresh
//! Delete      ─▶ remove under cursor, unfinish             refresh
//! Left/Right  ─▶ move cursor                               refresh
//! ```
//!
//! A printable non-delimiter arriving after a finished sentence starts a
//! fresh buffer.

use super::classifier::Action;
use super::text_buffer::TextBuffer;

// ---------------------------------------------------------------------------
// WordAccumulator
// ---------------------------------------------------------------------------

/// Letters of the word being typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordAccumulator {
    word: String,
}

impl WordAccumulator {
    pub fn push(&mut self, c: char) {
        self.word.push(c);
    }

    pub fn pop(&mut self) {
        self.word.pop();
    }

    /// The accumulated word, leaving the accumulator empty.  `None` when
    /// nothing was accumulated.
    pub fn take(&mut self) -> Option<String> {
        (!self.word.is_empty()).then(|| std::mem::take(&mut self.word))
    }

    pub fn clear(&mut self) {
        self.word.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.word
    }
}

// ---------------------------------------------------------------------------
// SentenceState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentenceState {
    /// A terminal delimiter (or Enter) was the last boundary typed.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the runner must do after an action was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// A word boundary completed this word.
    pub completed_word: Option<String>,
    /// The buffer or cursor changed; refresh the live text.
    pub refresh: bool,
    /// A boundary was typed; (re)start the sentence-translation debounce.
    pub translate: bool,
}

// ---------------------------------------------------------------------------
// TypingState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TypingState {
    buffer: TextBuffer,
    word: WordAccumulator,
    sentence: SentenceState,
}

impl TypingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn word(&self) -> &str {
        self.word.as_str()
    }

    pub fn sentence_finished(&self) -> bool {
        self.sentence.finished
    }

    /// Apply one action.
    pub fn handle(&mut self, action: Action) -> Outcome {
        let is_delimiter = matches!(action, Action::Delimiter { .. });
        if action.printable().is_some() && self.sentence.finished && !is_delimiter {
            self.buffer.clear();
            self.word.clear();
            self.sentence.finished = false;
        }

        let mut out = Outcome {
            refresh: true,
            ..Outcome::default()
        };
        match action {
            Action::Letter(c) => {
                self.buffer.insert(c);
                self.word.push(c);
            }
            Action::Delimiter { ch, sentence_end } => {
                self.buffer.insert(ch);
                out.completed_word = self.word.take();
                out.translate = true;
                if sentence_end {
                    self.sentence.finished = true;
                }
            }
            Action::Symbol(c) => self.buffer.insert(c),
            Action::Space => {
                self.buffer.insert(' ');
                out.completed_word = self.word.take();
                out.translate = true;
            }
            Action::Enter => {
                self.buffer.insert('\n');
                out.completed_word = self.word.take();
                out.translate = true;
                self.sentence.finished = true;
            }
            Action::Backspace => {
                self.buffer.backspace();
                self.word.pop();
                self.sentence.finished = false;
            }
            Action::Delete => {
                self.buffer.delete();
                self.sentence.finished = false;
            }
            Action::Left => self.buffer.move_left(),
            Action::Right => self.buffer.move_right(),
        }
        out
    }

    /// Trimmed buffer text, the input for sentence translation.
    pub fn sentence_text(&self) -> String {
        self.buffer.text().trim().to_string()
    }

    pub fn live_text(&self) -> String {
        self.buffer.text_with_cursor()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
