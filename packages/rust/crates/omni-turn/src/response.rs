//! Read-only normalized view over a raw model response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Responses shorter than this (in chars) on both text and reasoning, with no
/// tool calls, are shaky.
pub const SHAKY_MIN_CHARS: usize = 10;

/// One typed content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Reasoning { text: String },
    ToolUse { id: String, name: String, input: Value },
}

/// Raw response content as produced by a model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResponse {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ContentBlock>> for RawResponse {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}

/// Borrowed tool-use block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

/// Normalized response. Text and reasoning are flattened once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseView {
    blocks: Vec<ContentBlock>,
    text: String,
    reasoning: String,
}

impl ResponseView {
    pub fn new(raw: impl Into<RawResponse>) -> Self {
        let blocks = match raw.into() {
            RawResponse::Text(text) => vec![ContentBlock::Text { text }],
            RawResponse::Blocks(blocks) => blocks,
        };
        let mut text = String::new();
        let mut reasoning_parts: Vec<&str> = Vec::new();
        for block in &blocks {
            match block {
                ContentBlock::Text { text: part } => text.push_str(part),
                ContentBlock::Reasoning { text: part } => reasoning_parts.push(part),
                ContentBlock::ToolUse { .. } => {}
            }
        }
        let reasoning = reasoning_parts.join("\n\n");
        Self {
            blocks,
            text,
            reasoning,
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Reasoning blocks joined by a blank line.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn tool_calls(&self) -> Vec<ToolUse<'_>> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls_named(&self, name: &str) -> Vec<ToolUse<'_>> {
        self.tool_calls()
            .into_iter()
            .filter(|call| call.name == name)
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }

    /// Degenerate turn: no tool calls and both text and reasoning empty or
    /// under [`SHAKY_MIN_CHARS`].
    pub fn is_shaky(&self) -> bool {
        is_shaky_parts(self.trimmed_text(), &self.reasoning, self.has_tool_calls())
    }
}

/// Shaky classification. Only the text is expected trimmed; reasoning is
/// measured as-is.
pub fn is_shaky_parts(trimmed_text: &str, reasoning: &str, has_tool_calls: bool) -> bool {
    if has_tool_calls {
        return false;
    }
    if trimmed_text.is_empty() && reasoning.is_empty() {
        return true;
    }
    trimmed_text.chars().count() < SHAKY_MIN_CHARS && reasoning.chars().count() < SHAKY_MIN_CHARS
}

#[cfg(test)]
#[path = "../tests/unit/response.rs"]
mod tests;
