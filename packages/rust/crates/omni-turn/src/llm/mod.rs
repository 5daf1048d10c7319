//! Model stream port and provider clients.
//!
//! Every backend implements [`ModelStream`]; [`provider_factory`] selects one
//! from a lookup table keyed by provider id.

mod factory;
mod openai;
mod sse;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::response::{ContentBlock, RawResponse};
use crate::session::ChatMessage;
use crate::stream::ToolCallAssembler;
use crate::tools::ToolDefinition;

pub use factory::{PROVIDERS, ProviderEntry, ProviderParams, provider_factory};
pub use openai::{ChunkTranslator, OpenAiCompatibleClient};
pub use sse::SseDecoder;

/// Token totals reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One event of a model response stream, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    RunStarted {
        model: String,
    },
    StageChange {
        stage: String,
    },
    ContentDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    /// Fragment of tool call `index`. `id`/`name` arrive on the first
    /// fragment; later ones carry argument text only.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
    /// The argument block of tool call `index` is complete.
    ToolCallEnd {
        index: usize,
    },
    Usage(Usage),
    RunCompleted {
        usage: Option<Usage>,
    },
}

/// Boxed event stream returned by [`ModelStream::stream`].
pub type EventStream = BoxStream<'static, anyhow::Result<StreamEvent>>;

/// Input to one model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

/// Model backend capability.
#[async_trait]
pub trait ModelStream: Send + Sync {
    /// Lookup-table id of this backend.
    fn provider_id(&self) -> &str;

    /// Tokens per character used by [`estimate_tokens`](Self::estimate_tokens).
    fn tokens_per_char(&self) -> f64;

    /// Start a streamed response.
    async fn stream(&self, request: ModelRequest) -> anyhow::Result<EventStream>;

    /// Full response in one call. Defaults to draining [`stream`](Self::stream).
    async fn complete(&self, request: ModelRequest) -> anyhow::Result<RawResponse> {
        let mut events = self.stream(request).await?;
        let mut text = String::new();
        let mut reasoning = String::new();
        let mut assembler = ToolCallAssembler::new();
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::ContentDelta { text: part } => text.push_str(&part),
                StreamEvent::ReasoningDelta { text: part } => reasoning.push_str(&part),
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    assembler.push_delta(index, id.as_deref(), name.as_deref(), arguments.as_deref());
                }
                StreamEvent::ToolCallEnd { index } => assembler.end_block(index),
                StreamEvent::RunCompleted { .. } => break,
                StreamEvent::RunStarted { .. }
                | StreamEvent::StageChange { .. }
                | StreamEvent::Usage(_) => {}
            }
        }
        let mut blocks = Vec::new();
        if !reasoning.is_empty() {
            blocks.push(ContentBlock::Reasoning { text: reasoning });
        }
        if !text.is_empty() {
            blocks.push(ContentBlock::Text { text });
        }
        for invocation in assembler.finish() {
            blocks.push(ContentBlock::ToolUse {
                id: invocation.id,
                name: invocation.name,
                input: invocation.input.unwrap_or(serde_json::Value::Null),
            });
        }
        Ok(RawResponse::Blocks(blocks))
    }

    /// `ceil(chars × tokens_per_char)`.
    fn estimate_tokens(&self, text: &str) -> u64 {
        estimate_tokens(text, self.tokens_per_char())
    }
}

/// Character-ratio token estimate. Non-positive or non-finite ratios give 0.
pub fn estimate_tokens(text: &str, tokens_per_char: f64) -> u64 {
    if !tokens_per_char.is_finite() || tokens_per_char <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let estimate = (chars * tokens_per_char).ceil() as u64;
    estimate
}
