//! Source locations as recorded in coverage maps
//!
//! Lines are 1-based, columns are 0-based. A node whose span is synthetic
//! (dummy) has no location and is never counted.

use serde::{Deserialize, Serialize};
use std::fmt;
use swc_common::{SourceMap, Span};

/// A line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// Start and end position of a counted construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Self {
        Location { start, end }
    }

    /// Resolve an swc span against the source map
    ///
    /// Returns `None` for dummy spans, which mark nodes synthesized by a
    /// transform rather than parsed from source.
    pub fn from_span(span: Span, source_map: &SourceMap) -> Option<Self> {
        if span.is_dummy() {
            return None;
        }
        let start = source_map.lookup_char_pos(span.lo);
        let end = source_map.lookup_char_pos(span.hi);
        Some(Location {
            start: Position::new(start.line as u32, start.col.0 as u32),
            end: Position::new(end.line as u32, end.col.0 as u32),
        })
    }

    /// A one-column location at this location's start
    pub fn first_column(&self) -> Self {
        Location {
            start: self.start,
            end: Position::new(self.start.line, self.start.column + 1),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::{sync::Lrc, BytePos, FileName, DUMMY_SP};

    #[test]
    fn test_dummy_span_has_no_location() {
        let cm: Lrc<SourceMap> = Default::default();
        assert_eq!(Location::from_span(DUMMY_SP, &cm), None);
    }

    #[test]
    fn test_span_resolves_to_one_based_lines() {
        let cm: Lrc<SourceMap> = Default::default();
        let file = cm.new_source_file(
            FileName::Custom("a.js".into()).into(),
            "let a;\nlet b;".to_string(),
        );
        let lo = file.start_pos + BytePos(7);
        let hi = file.start_pos + BytePos(13);
        let loc = Location::from_span(Span::new(lo, hi), &cm).expect("located");
        assert_eq!(loc.start, Position::new(2, 0));
        assert_eq!(loc.end, Position::new(2, 6));
        assert_eq!(loc.first_column().end, Position::new(2, 1));
        assert_eq!(loc.to_string(), "2:0");
    }
}
