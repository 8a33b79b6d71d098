//! Source location tracking

/// A span represents a range in one input text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start char offset
    pub start: usize,
    /// End char offset (exclusive)
    pub end: usize,
    /// 1-based line of the start offset
    pub line: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    /// Span covering a whole source line, used when only the line number is known
    pub fn at_line(line: usize) -> Self {
        Self { start: 0, end: 0, line }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 0 }
    }

    /// Merge two spans
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earliest_line() {
        let a = Span::new(10, 14, 3);
        let b = Span::new(2, 6, 1);
        let merged = a.merge(&b);
        assert_eq!(merged, Span::new(2, 14, 1));
    }
}
