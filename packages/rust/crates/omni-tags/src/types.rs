//! Match results returned by the marker matcher.

use serde::Serialize;

/// A complete marker found inside a text buffer.
///
/// `start..end` are byte offsets into the searched text and always fall on
/// UTF-8 character boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagMatch<'a> {
    /// Byte offset of the first marker byte.
    pub start: usize,
    /// Byte offset one past the last marker byte.
    pub end: usize,
    /// The matched marker as registered in the pool.
    pub tag: &'a str,
}

impl TagMatch<'_> {
    /// Marker length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false; markers are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A marker within the requested edit distance of a probe string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarTag {
    /// Registered marker text.
    pub tag: String,
    /// Levenshtein distance (in chars) from the probe.
    pub distance: usize,
}
