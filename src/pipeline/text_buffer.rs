//! Cursor-addressed text buffer mirroring what the user is typing.
//!
//! Stored as `Vec<char>` so the cursor is a character index and every edit
//! is O(n) in the (short) sentence length at worst.

/// Marker rendered at the cursor position in the live display.
pub const CURSOR_MARKER: char = '|';

/// Characters plus a cursor with `0 ≤ cursor ≤ len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the cursor and advance it.
    pub fn insert(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Remove the character before the cursor.  No-op at the start.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    /// Remove the character under the cursor.  No-op at the end.
    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.chars.len() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Text with [`CURSOR_MARKER`] at the cursor, for the live display only.
    pub fn text_with_cursor(&self) -> String {
        let mut out = String::with_capacity(self.chars.len() + 1);
        out.extend(&self.chars[..self.cursor]);
        out.push(CURSOR_MARKER);
        out.extend(&self.chars[self.cursor..]);
        out
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
