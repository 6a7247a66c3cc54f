//! Source location tracking

use std::fmt;

/// A position in the source text. Lines and columns both start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    /// Create a new span
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { line: 1, col: 1 }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.line, self.col)
    }
}
