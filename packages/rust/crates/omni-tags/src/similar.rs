//! Approximate marker lookup: bounded Levenshtein scan with a memo cache.

use std::collections::{HashMap, VecDeque};

use crate::types::SimilarTag;

/// Maximum memoized `(input, max_distance)` lookups before eviction.
pub const SIMILAR_CACHE_CAPACITY: usize = 256;

type CacheKey = (String, usize);

/// Memo of recent fuzzy lookups.
///
/// When the cache is full the oldest half of the entries (by insertion order)
/// is dropped in one pass, so eviction cost is amortized across inserts.
#[derive(Debug)]
pub(crate) struct SimilarCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<SimilarTag>>,
    order: VecDeque<CacheKey>,
}

impl SimilarCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, input: &str, max_distance: usize) -> Option<Vec<SimilarTag>> {
        self.entries
            .get(&(input.to_string(), max_distance))
            .cloned()
    }

    pub(crate) fn insert(&mut self, input: &str, max_distance: usize, value: Vec<SimilarTag>) {
        let key = (input.to_string(), max_distance);
        if self.entries.contains_key(&key) {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest_half();
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_oldest_half(&mut self) {
        let evict = self.order.len() / 2;
        for _ in 0..evict {
            if let Some(key) = self.order.pop_front() {
                self.entries.remove(&key);
            }
        }
        tracing::trace!(
            evicted = evict,
            remaining = self.entries.len(),
            "similar-tag cache evicted oldest half"
        );
    }
}

/// Scan `tags` for entries within `max_distance` edits of `input`.
///
/// Results are ordered by distance, then by registration order.
pub(crate) fn scan_similar(tags: &[String], input: &str, max_distance: usize) -> Vec<SimilarTag> {
    let input_len = input.chars().count();
    let mut found: Vec<(usize, usize)> = tags
        .iter()
        .enumerate()
        .filter(|(_, tag)| tag.chars().count().abs_diff(input_len) <= max_distance)
        .filter_map(|(index, tag)| {
            let distance = levenshtein_distance(input, tag);
            (distance <= max_distance).then_some((distance, index))
        })
        .collect();
    found.sort_unstable();
    found
        .into_iter()
        .map(|(distance, index)| SimilarTag {
            tag: tags[index].clone(),
            distance,
        })
        .collect()
}

/// Calculate Levenshtein distance between two strings.
pub(crate) fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let (m, n) = (a_chars.len(), b_chars.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            let deletion = prev[j] + 1;
            let insertion = curr[j - 1] + 1;
            let substitution = prev[j - 1] + cost;
            curr[j] = deletion.min(insertion).min(substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("<tool_call>", "<tool_call>"), 0);
        assert_eq!(levenshtein_distance("<tool_cal>", "<tool_call>"), 1);
        assert_eq!(levenshtein_distance("héllo", "hello"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn cache_evicts_oldest_half_when_full() {
        let mut cache = SimilarCache::new(4);
        for key in ["a", "b", "c", "d"] {
            cache.insert(key, 1, Vec::new());
        }
        assert_eq!(cache.len(), 4);

        cache.insert("e", 1, Vec::new());
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a", 1).is_none());
        assert!(cache.get("b", 1).is_none());
        assert!(cache.get("c", 1).is_some());
        assert!(cache.get("e", 1).is_some());
    }
}
