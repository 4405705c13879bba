//! Text normalization and line indexing.
//!
//! All source text entering the engine goes through
//! [`normalize_line_endings`] first, so byte offsets are stable regardless
//! of the original terminator style. `str::lines()` strips `\r\n` and `\n`
//! alike but reports the same `line.len()` either way, so any offset
//! accounting done on un-normalized text drifts one byte per `\r\n` line.
//! Normalize first, then index actual byte positions.

/// Normalize line endings to Unix style (`\n`).
///
/// Converts `\r\n` and bare `\r` to `\n`. This is the canonical
/// normalization function for the workspace; the engine calls it before
/// conditioning lines, and so should any other consumer of raw source.
pub fn normalize_line_endings(text: &str) -> String {
    // Fast path: no `\r` bytes means the text is already normalized.
    if !text.as_bytes().contains(&b'\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Precomputed byte offset of the start of every line in a source string.
///
/// Built by scanning normalized text once; lookups are binary searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// `offsets[i]` is the byte offset where line `i` (0-indexed) begins.
    offsets: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from already-normalized source text.
    ///
    /// The text must use `\n` as its only line terminator; call
    /// [`normalize_line_endings`] first if unsure.
    pub fn new(text: &str) -> Self {
        let mut offsets = vec![0];
        for (i, byte) in text.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                offsets.push((i + 1) as u32);
            }
        }
        Self { offsets }
    }

    /// Number of lines, counting the (possibly empty) line after a
    /// trailing `\n`.
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset where the given line (0-indexed) starts, or `None` if
    /// out of range.
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.offsets.get(line).copied()
    }

    /// Convert a byte offset to a 1-indexed `(line, column)` pair for
    /// user-facing diagnostics.
    pub fn offset_to_line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        let col = offset - self.offsets[line];
        (line as u32 + 1, col + 1)
    }
}
