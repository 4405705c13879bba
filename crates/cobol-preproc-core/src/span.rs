//! Source location tracking.
//!
//! Every token and diagnostic carries a [`Span`]: a byte range within one
//! source file. The main compilation unit is [`FileId::MAIN`]; the engine
//! allocates a fresh [`FileId`] for each copybook it expands, so a span
//! always points into the text it was actually lexed from.

use std::ops::Range;

/// Unique identifier for a source file.
///
/// Distinguishes tokens from different files (main source vs copybooks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileId(pub u32);

impl FileId {
    /// The file ID of the main compilation unit.
    pub const MAIN: FileId = FileId(0);
}

/// A contiguous byte range in one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// The source file this span belongs to.
    pub file: FileId,
    /// Byte offset of the start of this span (0-indexed).
    pub start: u32,
    /// Byte offset of the end of this span (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span in the main compilation unit.
    pub fn main(start: u32, end: u32) -> Self {
        Self::new(FileId::MAIN, start, end)
    }

    /// Create an empty span at a position.
    pub fn point(file: FileId, pos: u32) -> Self {
        Self::new(file, pos, pos)
    }

    /// Create a dummy span for synthesized tokens.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Length of this span in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Check if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Extend this span to cover another span in the same file.
    pub fn extend(self, other: Span) -> Self {
        debug_assert_eq!(self.file, other.file, "cannot extend span across files");
        Self {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Convert to a byte range usable for slicing the source text.
    pub fn to_range(&self) -> Range<usize> {
        (self.start as usize)..(self.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_basics() {
        let span = Span::new(FileId(1), 10, 20);
        assert_eq!(span.file, FileId(1));
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert_eq!(span.to_range(), 10..20);
    }

    #[test]
    fn test_span_main_and_point() {
        assert_eq!(Span::main(5, 9).file, FileId::MAIN);
        let p = Span::point(FileId(2), 42);
        assert!(p.is_empty());
        assert_eq!(p.start, 42);
    }

    #[test]
    fn test_span_extend() {
        let merged = Span::main(10, 20).extend(Span::main(15, 30));
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    fn test_dummy_span() {
        let span = Span::dummy();
        assert_eq!(span.file, FileId::MAIN);
        assert!(span.is_empty());
    }
}
