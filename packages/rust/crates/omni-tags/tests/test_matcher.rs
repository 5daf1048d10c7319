//! Tests for the marker prefix tree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use omni_tags::{TagError, TagMatcher};

fn tool_markers() -> TagMatcher {
    TagMatcher::new(["<tool_call>", "</tool_call>", "[TOOL_CALL]", "[/TOOL_CALL]"])
        .expect("marker pool should build")
}

#[test]
fn test_rejects_empty_pool_and_empty_marker() {
    assert_eq!(
        TagMatcher::new(Vec::<String>::new()).err(),
        Some(TagError::EmptyPool)
    );
    assert_eq!(
        TagMatcher::new(["<a>", ""]).err(),
        Some(TagError::EmptyMarker)
    );
}

#[test]
fn test_earliest_tag_prefers_lowest_offset() {
    let matcher = tool_markers();
    let text = "hello [TOOL_CALL] then <tool_call>";
    let found = matcher.find_earliest_tag(text).expect("marker expected");
    assert_eq!(found.start, 6);
    assert_eq!(found.tag, "[TOOL_CALL]");
    assert_eq!(&text[found.start..found.end], "[TOOL_CALL]");
}

#[test]
fn test_earliest_tag_prefers_shortest_at_same_offset() {
    let matcher = TagMatcher::new(["<invoke>", "<in"]).expect("pool");
    let found = matcher
        .find_earliest_tag("xx<invoke>")
        .expect("marker expected");
    assert_eq!(found.start, 2);
    assert_eq!(found.tag, "<in");
}

#[test]
fn test_earliest_tag_none_without_complete_marker() {
    let matcher = tool_markers();
    assert!(matcher.find_earliest_tag("no markers <tool_cal here").is_none());
    assert!(matcher.find_earliest_tag("").is_none());
}

#[test]
fn test_offsets_are_char_boundaries_with_multibyte_text() {
    let matcher = tool_markers();
    let text = "héllo wörld <tool_call>{}";
    let found = matcher.find_earliest_tag(text).expect("marker expected");
    assert!(text.is_char_boundary(found.start));
    assert_eq!(&text[found.start..found.end], "<tool_call>");
}

#[test]
fn test_partial_at_end_reports_longest_strict_prefix() {
    let matcher = tool_markers();
    assert_eq!(matcher.find_longest_partial_at_end("answer <tool_"), 6);
    assert_eq!(matcher.find_longest_partial_at_end("answer <"), 1);
    assert_eq!(matcher.find_longest_partial_at_end("answer </tool_call"), 11);
    assert_eq!(matcher.find_longest_partial_at_end("answer"), 0);
    assert_eq!(matcher.find_longest_partial_at_end(""), 0);
}

#[test]
fn test_partial_at_end_excludes_complete_marker() {
    let matcher = TagMatcher::new(["<a", "<ab>"]).expect("pool");
    // "<a" is itself a complete marker, so it is not an ambiguous tail.
    assert_eq!(matcher.find_longest_partial_at_end("text <a"), 0);
    assert_eq!(matcher.find_longest_partial_at_end("text <ab"), 3);
    assert_eq!(matcher.find_longest_partial_at_end("text <"), 1);
}

#[test]
fn test_similar_tags_within_distance() {
    let matcher = tool_markers();
    let found = matcher.find_similar_tags("<tool_cal>", 2);
    assert_eq!(found.first().map(|s| s.tag.as_str()), Some("<tool_call>"));
    assert_eq!(found.first().map(|s| s.distance), Some(1));
    assert!(matcher.find_similar_tags("<something_else>", 2).is_empty());
}

#[test]
fn test_similar_tags_are_memoized() {
    let matcher = tool_markers();
    assert_eq!(matcher.similar_cache_len(), 0);
    let first = matcher.find_similar_tags("</tool_cal>", 1);
    let second = matcher.find_similar_tags("</tool_cal>", 1);
    assert_eq!(first, second);
    assert_eq!(matcher.similar_cache_len(), 1);
}

#[test]
fn test_similar_cache_stays_bounded() {
    let matcher = tool_markers();
    for i in 0..(omni_tags::SIMILAR_CACHE_CAPACITY * 3) {
        let _ = matcher.find_similar_tags(&format!("<query{i}>"), 1);
    }
    assert!(matcher.similar_cache_len() <= omni_tags::SIMILAR_CACHE_CAPACITY);
}

#[test]
fn test_earliest_tag_only_reports_real_substrings() {
    let matcher = TagMatcher::new(["<a>", "<ab>", "</a>", "ab", "[x]"]).expect("pool");
    let alphabet: Vec<char> = "<>/ab[]x ".chars().collect();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..2_000 {
        let len = rng.gen_range(0..24);
        let text: String = (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();

        match matcher.find_earliest_tag(&text) {
            Some(found) => {
                assert_eq!(&text[found.start..found.end], found.tag);
                for earlier in 0..found.start {
                    assert!(
                        !matcher.tags().iter().any(|tag| text[earlier..].starts_with(tag.as_str())),
                        "earlier marker missed in {text:?}"
                    );
                }
            }
            None => {
                assert!(
                    !matcher.tags().iter().any(|tag| text.contains(tag.as_str())),
                    "marker missed in {text:?}"
                );
            }
        }
    }
}
