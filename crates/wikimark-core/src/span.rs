//! Source location tracking for tokens.
//!
//! Every token carries a `Span` pointing back into the markup it was cut
//! from, so diagnostics can quote the offending source.

/// A byte range in the source text.
///
/// Spans use byte offsets (not character offsets).
/// Both `start` and `end` are inclusive-exclusive: `[start, end)`.
///
/// # Example
///
/// ```rust
/// use wikimark_core::span::Span;
///
/// let span = Span::new(0, 10);
/// assert_eq!(span.len(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Starting byte offset (inclusive).
    pub start: u32,
    /// Ending byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Build a span from `usize` cursor positions.
    #[inline]
    pub(crate) fn from_range(start: usize, end: usize) -> Self {
        Self::new(start as u32, end as u32)
    }

    /// Get the length of this span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Merge two spans into one covering both.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Borrow the covered text out of `source`, if the range is valid there.
    #[inline]
    pub fn slice(self, source: &str) -> Option<&str> {
        source.get(self.start as usize..self.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let merged = Span::new(4, 6).merge(Span::new(1, 3));
        assert_eq!(merged, Span::new(1, 6));
        assert_eq!(merged.len(), 5);
    }

    #[test]
    fn slice_respects_char_boundaries() {
        let source = "가나다";
        assert_eq!(Span::new(0, 3).slice(source), Some("가"));
        assert_eq!(Span::new(0, 2).slice(source), None);
        assert!(Span::new(3, 3).is_empty());
    }
}
