//! Byte-level prefix tree over a fixed marker pool.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::TagError;
use crate::similar::{SIMILAR_CACHE_CAPACITY, SimilarCache, scan_similar};
use crate::types::{SimilarTag, TagMatch};

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<u8, usize>,
    terminal: Option<usize>,
}

/// Marker matcher built once from a fixed pool of marker strings.
///
/// Lookups walk a byte trie, so a scan costs `O(text.len() * depth)` where
/// depth is bounded by the longest marker. Marker matches always start on a
/// UTF-8 lead byte, which keeps every returned offset on a char boundary.
#[derive(Debug)]
pub struct TagMatcher {
    nodes: Vec<TrieNode>,
    tags: Vec<String>,
    max_tag_len: usize,
    similar: Mutex<SimilarCache>,
}

impl TagMatcher {
    /// Build a matcher from `markers`. Duplicate markers are ignored.
    ///
    /// # Errors
    /// Returns [`TagError::EmptyMarker`] for an empty marker and
    /// [`TagError::EmptyPool`] when no markers were supplied.
    pub fn new<I, S>(markers: I) -> Result<Self, TagError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut matcher = Self {
            nodes: vec![TrieNode::default()],
            tags: Vec::new(),
            max_tag_len: 0,
            similar: Mutex::new(SimilarCache::new(SIMILAR_CACHE_CAPACITY)),
        };
        for marker in markers {
            let marker = marker.into();
            if marker.is_empty() {
                return Err(TagError::EmptyMarker);
            }
            matcher.insert(marker);
        }
        if matcher.tags.is_empty() {
            return Err(TagError::EmptyPool);
        }
        Ok(matcher)
    }

    fn insert(&mut self, marker: String) {
        let mut node = 0;
        for &byte in marker.as_bytes() {
            node = match self.nodes[node].children.get(&byte) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(byte, next);
                    next
                }
            };
        }
        if self.nodes[node].terminal.is_none() {
            self.max_tag_len = self.max_tag_len.max(marker.len());
            self.nodes[node].terminal = Some(self.tags.len());
            self.tags.push(marker);
        }
    }

    fn walk(&self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().try_fold(0usize, |node, byte| {
            self.nodes[node].children.get(byte).copied()
        })
    }

    /// Registered markers in registration order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Length in bytes of the longest registered marker.
    #[must_use]
    pub fn max_tag_len(&self) -> usize {
        self.max_tag_len
    }

    /// True when `candidate` is exactly one of the registered markers.
    #[must_use]
    pub fn is_tag(&self, candidate: &str) -> bool {
        self.walk(candidate.as_bytes())
            .is_some_and(|node| self.nodes[node].terminal.is_some())
    }

    /// Find the lowest-offset complete marker in `text`.
    ///
    /// When several markers start at the same offset the shortest one wins.
    /// Start offsets are scanned in ascending order, so the first hit is final.
    #[must_use]
    pub fn find_earliest_tag(&self, text: &str) -> Option<TagMatch<'_>> {
        let bytes = text.as_bytes();
        for start in 0..bytes.len() {
            let mut node = 0;
            for (offset, byte) in bytes[start..].iter().enumerate() {
                let Some(&next) = self.nodes[node].children.get(byte) else {
                    break;
                };
                node = next;
                if let Some(tag_index) = self.nodes[node].terminal {
                    return Some(TagMatch {
                        start,
                        end: start + offset + 1,
                        tag: &self.tags[tag_index],
                    });
                }
            }
        }
        None
    }

    /// Length of the longest suffix of `text` that is a strict prefix of some
    /// marker without being a complete marker itself; `0` when none.
    ///
    /// Streaming callers withhold that many trailing bytes until more input
    /// shows whether a marker is forming.
    #[must_use]
    pub fn find_longest_partial_at_end(&self, text: &str) -> usize {
        let bytes = text.as_bytes();
        let longest = bytes.len().min(self.max_tag_len.saturating_sub(1));
        for len in (1..=longest).rev() {
            let suffix = &bytes[bytes.len() - len..];
            if let Some(node) = self.walk(suffix) {
                let node = &self.nodes[node];
                if node.terminal.is_none() && !node.children.is_empty() {
                    return len;
                }
            }
        }
        0
    }

    /// Markers within `max_distance` character edits of `input`.
    ///
    /// Results are memoized per `(input, max_distance)`.
    #[must_use]
    pub fn find_similar_tags(&self, input: &str, max_distance: usize) -> Vec<SimilarTag> {
        if let Some(hit) = self.lock_similar().get(input, max_distance) {
            return hit;
        }
        let found = scan_similar(&self.tags, input, max_distance);
        self.lock_similar()
            .insert(input, max_distance, found.clone());
        found
    }

    /// Number of memoized fuzzy lookups currently held.
    #[must_use]
    pub fn similar_cache_len(&self) -> usize {
        self.lock_similar().len()
    }

    fn lock_similar(&self) -> MutexGuard<'_, SimilarCache> {
        match self.similar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
