//! Source locations
//!
//! A `FileLoc` is the pair (file, range). Two occurrences of a symbol are the
//! same occurrence exactly when their `FileLoc`s are equal, which is what the
//! usage ledger deduplicates on.

use crate::id::FileId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position (both as reported by the front-end).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// A resolved location: file identity plus range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLoc {
    pub file: FileId,
    pub range: Range,
}

impl FileLoc {
    pub fn new(file: FileId, range: Range) -> Self {
        Self { file, range }
    }
}

impl fmt::Display for FileLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.file, self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_display() {
        let range = Range::new(Position::new(3, 1), Position::new(3, 5));
        assert_eq!(range.to_string(), "3:1-3:5");
    }

    #[test]
    fn test_file_loc_equality_covers_file_and_range() {
        let range = Range::new(Position::new(1, 0), Position::new(1, 4));
        let a = FileLoc::new(FileId(1), range);
        let b = FileLoc::new(FileId(1), range);
        let c = FileLoc::new(FileId(2), range);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
