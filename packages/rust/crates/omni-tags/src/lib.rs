//! omni-tags - Marker matching for streamed model output
//!
//! A byte-level prefix tree over a fixed pool of marker strings (for example
//! `<tool_call>` / `</tool_call>`), answering three questions a streaming
//! consumer needs:
//!
//! - where is the earliest complete marker in a buffer,
//! - how many trailing bytes might still grow into a marker,
//! - which markers are a few edits away from a malformed token.
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-tags/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # TagError
//! ├── types.rs    # TagMatch, SimilarTag
//! ├── matcher.rs  # TagMatcher (prefix tree)
//! └── similar.rs  # Levenshtein scan + bounded memo cache
//! ```
//!
//! # Example
//!
//! ```rust
//! use omni_tags::TagMatcher;
//!
//! let matcher = TagMatcher::new(["<tool_call>", "</tool_call>"]).unwrap();
//! let found = matcher.find_earliest_tag("text <tool_call>{}").unwrap();
//! assert_eq!(found.start, 5);
//! assert_eq!(matcher.find_longest_partial_at_end("text </tool"), 6);
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod error;
mod matcher;
mod similar;
mod types;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::TagError;
pub use matcher::TagMatcher;
pub use similar::SIMILAR_CACHE_CAPACITY;
pub use types::{SimilarTag, TagMatch};
