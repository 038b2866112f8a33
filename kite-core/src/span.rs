//! Source positions.
//!
//! Inside the compiler every node carries a [`Span`]: a file id plus a
//! half-open byte range. Editors talk in lines and characters instead, so
//! [`LineIndex`] converts spans into [`TextRange`]s when metadata is
//! written out.
//!
//! Position convention used everywhere outside the compiler: lines and
//! characters are 0-based, and characters count UTF-16 code units.

use core::fmt;

/// Identifies which source text a span points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// The `std_source` passed alongside the user program.
    pub const STD: FileId = FileId(0);
    /// The user program (`contents`).
    pub const USER: FileId = FileId(1);
    /// Compiler builtins, which have no source text.
    pub const BUILTIN: FileId = FileId(2);
}

/// Half-open byte range `[start, end)` within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file_id: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file_id: FileId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start after end");
        Span {
            file_id,
            start,
            end,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(
            self.file_id,
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.file_id == other.file_id && self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Half-open `[start, end)` range of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub const fn new(start: Position, end: Position) -> Self {
        TextRange { start, end }
    }

    pub fn contains(&self, point: Position) -> bool {
        self.start <= point && point < self.end
    }
}

/// Byte offset → line/character conversion for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    /// Byte offset at which each line starts.
    line_starts: Vec<u32>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        LineIndex {
            source,
            line_starts,
        }
    }

    /// Position of a byte offset. Offsets past the end clamp to the end of
    /// the text; offsets inside a multi-byte character count the
    /// character as already passed.
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.source.len() as u32);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line] as usize;
        let character = self.source[line_start..]
            .char_indices()
            .take_while(|&(i, _)| line_start + i < offset as usize)
            .map(|(_, ch)| ch.len_utf16() as u32)
            .sum();
        Position::new(line as u32, character)
    }

    pub fn range(&self, span: Span) -> TextRange {
        TextRange::new(self.position(span.start), self.position(span.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_offsets_to_zero_based_positions() {
        let index = LineIndex::new("fn a\n  let x\n");
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(3), Position::new(0, 3));
        assert_eq!(index.position(5), Position::new(1, 0));
        assert_eq!(index.position(11), Position::new(1, 6));
        assert_eq!(index.position(13), Position::new(2, 0));
        assert_eq!(index.position(99), Position::new(2, 0));
    }

    #[test]
    fn counts_characters_in_utf16_units() {
        // 'é' is two UTF-8 bytes and one UTF-16 unit, '𝄞' is four and two.
        let source = "é𝄞x";
        let index = LineIndex::new(source);
        assert_eq!(index.position(2), Position::new(0, 1));
        assert_eq!(index.position(6), Position::new(0, 3));
        assert_eq!(index.position(7), Position::new(0, 4));
    }

    #[test]
    fn range_containment_is_half_open() {
        let range = TextRange::new(Position::new(1, 4), Position::new(1, 9));
        assert!(range.contains(Position::new(1, 4)));
        assert!(range.contains(Position::new(1, 8)));
        assert!(!range.contains(Position::new(1, 9)));
        assert!(!range.contains(Position::new(0, 5)));
    }

    #[test]
    fn joined_span_covers_both() {
        let a = Span::new(FileId::USER, 4, 6);
        let b = Span::new(FileId::USER, 10, 12);
        assert_eq!(a.to(b), Span::new(FileId::USER, 4, 12));
        assert!(a.to(b).contains(a));
    }
}
