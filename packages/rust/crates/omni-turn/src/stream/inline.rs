//! Recovery of tool calls written as text markup inside content deltas.

use std::sync::Arc;

use omni_tags::{TagError, TagMatcher};
use serde_json::Value;

use crate::observability::SessionEvent;

/// `(open, close)` marker pairs recognised in content text.
pub const INLINE_MARKERS: [(&str, &str); 2] =
    [("<tool_call>", "</tool_call>"), ("[TOOL_CALL]", "[/TOOL_CALL]")];

const NEAR_MISS_DISTANCE: usize = 2;
const MAX_TOKEN_CHARS: usize = 24;

/// A tool call recovered from markup.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineCall {
    pub id: Option<String>,
    /// `None` when the body did not name a tool.
    pub name: Option<String>,
    /// Argument JSON text.
    pub arguments: String,
    pub raw: String,
}

/// A token that looks like a marker but is not one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearMiss {
    pub token: String,
    pub suggestion: String,
    pub distance: usize,
}

/// Result of one push (or the final flush).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineOutput {
    /// Text safe to show now.
    pub visible: String,
    pub calls: Vec<InlineCall>,
    /// Only populated by [`InlineToolFilter::finish`].
    pub near_misses: Vec<NearMiss>,
}

/// Splits content deltas into visible text and inline tool calls.
///
/// A trailing fragment that could still grow into a marker is withheld
/// until the next delta decides it.
pub struct InlineToolFilter {
    matcher: Arc<TagMatcher>,
    pending: String,
    /// Close marker while inside a call body.
    inside: Option<&'static str>,
    open_marker: &'static str,
    emitted: String,
}

impl InlineToolFilter {
    /// Matcher over every marker in [`INLINE_MARKERS`].
    ///
    /// # Errors
    /// Never fails for the built-in markers; the signature mirrors
    /// [`TagMatcher::new`].
    pub fn default_matcher() -> Result<Arc<TagMatcher>, TagError> {
        TagMatcher::new(INLINE_MARKERS.iter().flat_map(|(open, close)| [*open, *close])).map(Arc::new)
    }

    pub fn new(matcher: Arc<TagMatcher>) -> Self {
        Self {
            matcher,
            pending: String::new(),
            inside: None,
            open_marker: "",
            emitted: String::new(),
        }
    }

    pub fn push(&mut self, delta: &str) -> InlineOutput {
        self.pending.push_str(delta);
        let mut output = InlineOutput::default();
        loop {
            if let Some(close) = self.inside {
                let Some(end) = self.pending.find(close) else {
                    break;
                };
                let body: String = self.pending[..end].to_string();
                self.pending.replace_range(..end + close.len(), "");
                self.inside = None;
                output.calls.push(parse_body(&body));
                continue;
            }

            let found = self
                .matcher
                .find_earliest_tag(&self.pending)
                .map(|m| (m.start, m.end, m.tag.to_string()));
            match found {
                Some((start, end, tag)) => {
                    output.visible.push_str(&self.pending[..start]);
                    if let Some(&(open, close)) =
                        INLINE_MARKERS.iter().find(|(open, _)| *open == tag)
                    {
                        self.inside = Some(close);
                        self.open_marker = open;
                    } else {
                        // stray close marker stays visible
                        output.visible.push_str(&self.pending[start..end]);
                    }
                    self.pending.replace_range(..end, "");
                }
                None => {
                    let hold = self.matcher.find_longest_partial_at_end(&self.pending);
                    let cut = self.pending.len() - hold;
                    output.visible.push_str(&self.pending[..cut]);
                    self.pending.replace_range(..cut, "");
                    break;
                }
            }
        }
        self.emitted.push_str(&output.visible);
        output
    }

    /// Flush withheld text and report near-miss markers in everything shown.
    ///
    /// An unterminated call body is returned as visible text.
    pub fn finish(&mut self) -> InlineOutput {
        let mut output = InlineOutput::default();
        if self.inside.take().is_some() {
            tracing::warn!(
                event = SessionEvent::ToolInlineNearMiss.as_str(),
                marker = self.open_marker,
                "inline tool call never closed; emitting as text"
            );
            output.visible.push_str(self.open_marker);
        }
        output.visible.push_str(&self.pending);
        self.pending.clear();
        self.emitted.push_str(&output.visible);
        output.near_misses = self.near_misses();
        for miss in &output.near_misses {
            tracing::warn!(
                event = SessionEvent::ToolInlineNearMiss.as_str(),
                token = %miss.token,
                suggestion = %miss.suggestion,
                distance = miss.distance,
                "marker-like token in model output"
            );
        }
        output
    }

    fn near_misses(&self) -> Vec<NearMiss> {
        let mut misses: Vec<NearMiss> = Vec::new();
        for token in bracket_tokens(&self.emitted) {
            if self.matcher.is_tag(token) || misses.iter().any(|m| m.token == token) {
                continue;
            }
            if let Some(best) = self
                .matcher
                .find_similar_tags(token, NEAR_MISS_DISTANCE)
                .into_iter()
                .find(|similar| similar.distance > 0)
            {
                misses.push(NearMiss {
                    token: token.to_string(),
                    suggestion: best.tag,
                    distance: best.distance,
                });
            }
        }
        misses
    }
}

/// `<...>` and `[...]` tokens without whitespace, up to a bounded length.
fn bracket_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for (start, open) in text.char_indices() {
        let close = match open {
            '<' => '>',
            '[' => ']',
            _ => continue,
        };
        let rest = &text[start + 1..];
        for (offset, c) in rest.char_indices() {
            if offset > MAX_TOKEN_CHARS || c.is_whitespace() || c == open {
                break;
            }
            if c == close {
                if offset > 0 {
                    tokens.push(&text[start..start + 1 + offset + c.len_utf8()]);
                }
                break;
            }
        }
    }
    tokens
}

fn parse_body(body: &str) -> InlineCall {
    let raw = body.to_string();
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body.trim()) else {
        return InlineCall {
            id: None,
            name: None,
            arguments: body.trim().to_string(),
            raw,
        };
    };
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string);
    let id = map.get("id").and_then(Value::as_str).map(str::to_string);
    let arguments = ["arguments", "parameters", "input"]
        .iter()
        .find_map(|key| map.get(*key))
        .map_or_else(
            || "{}".to_string(),
            |value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        );
    InlineCall {
        id,
        name,
        arguments,
        raw,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream_inline.rs"]
mod tests;
