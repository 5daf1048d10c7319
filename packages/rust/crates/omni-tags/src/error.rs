//! Error types for marker pool construction.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use thiserror::Error;

/// Error types for building a [`crate::TagMatcher`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// An empty marker would match at every offset.
    #[error("Marker pool contains an empty marker")]
    EmptyMarker,
    /// The pool has no markers at all.
    #[error("Marker pool is empty")]
    EmptyPool,
}
