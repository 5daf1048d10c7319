//! OpenAI-compatible streaming chat completions client.

use std::collections::{BTreeSet, VecDeque};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sse::SseDecoder;
use super::{EventStream, ModelRequest, ModelStream, StreamEvent, Usage};
use crate::session::ChatMessage;
use crate::tools::ToolDefinition;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ToolDef<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    function: FunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for ToolDef<'a> {
    fn from(definition: &'a ToolDefinition) -> Self {
        Self {
            typ: "function",
            function: FunctionDef {
                name: &definition.name,
                description: &definition.description,
                parameters: &definition.input_schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Maps OpenAI-style `chat.completion.chunk` payloads to [`StreamEvent`]s.
#[derive(Debug, Default)]
pub struct ChunkTranslator {
    started: bool,
    completed: bool,
    open_calls: BTreeSet<usize>,
    usage: Option<Usage>,
}

impl ChunkTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Translate one SSE payload.
    ///
    /// # Errors
    /// Returns an error when the payload is not valid chunk JSON.
    pub fn translate(&mut self, payload: &str) -> Result<Vec<StreamEvent>> {
        let payload = payload.trim();
        if payload == "[DONE]" {
            return Ok(self.complete());
        }
        let chunk: ChatChunk = serde_json::from_str(payload)
            .with_context(|| format!("invalid stream chunk: {payload}"))?;

        let mut events = Vec::new();
        if !self.started {
            self.started = true;
            events.push(StreamEvent::RunStarted {
                model: chunk.model.clone().unwrap_or_default(),
            });
        }
        for choice in chunk.choices {
            let delta = choice.delta;
            if let Some(text) = delta.reasoning_content.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::ReasoningDelta { text });
            }
            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::ContentDelta { text });
            }
            for (position, call) in delta.tool_calls.into_iter().enumerate() {
                let index = call.index.unwrap_or(position);
                let (name, arguments) = match call.function {
                    Some(function) => (non_blank(function.name), function.arguments),
                    None => (None, None),
                };
                self.open_calls.insert(index);
                events.push(StreamEvent::ToolCallDelta {
                    index,
                    id: non_blank(call.id),
                    name,
                    arguments: arguments.filter(|a| !a.is_empty()),
                });
            }
            if choice.finish_reason.is_some() {
                events.extend(self.close_open_calls());
            }
        }
        if let Some(usage) = chunk.usage {
            let usage = Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            };
            self.usage = Some(usage);
            events.push(StreamEvent::Usage(usage));
        }
        Ok(events)
    }

    /// Events owed when the byte stream ends without `[DONE]`.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.completed {
            return Vec::new();
        }
        self.complete()
    }

    fn complete(&mut self) -> Vec<StreamEvent> {
        let mut events = self.close_open_calls();
        self.completed = true;
        events.push(StreamEvent::RunCompleted { usage: self.usage });
        events
    }

    fn close_open_calls(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.open_calls)
            .into_iter()
            .map(|index| StreamEvent::ToolCallEnd { index })
            .collect()
    }
}

/// Streaming client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    provider_id: String,
    inference_url: String,
    api_key: Option<String>,
    tokens_per_char: f64,
}

impl OpenAiCompatibleClient {
    pub fn new(
        provider_id: impl Into<String>,
        inference_url: impl Into<String>,
        api_key: Option<String>,
        tokens_per_char: f64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_id: provider_id.into(),
            inference_url: inference_url.into(),
            api_key,
            tokens_per_char,
        }
    }

    pub fn inference_url(&self) -> &str {
        &self.inference_url
    }

    fn body<'a>(request: &'a ModelRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(request.messages.iter().cloned());
        let tools: Vec<ToolDef<'a>> = request.tools.iter().map(ToolDef::from).collect();
        ChatCompletionRequest {
            model: &request.model,
            messages,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            max_tokens: request.max_tokens,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        }
    }
}

struct StreamState {
    bytes: futures::stream::BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    translator: ChunkTranslator,
    queued: VecDeque<Result<StreamEvent>>,
    drained: bool,
}

impl StreamState {
    fn translate_all(&mut self, payloads: Vec<String>) {
        for payload in payloads {
            if self.translator.is_completed() {
                break;
            }
            match self.translator.translate(&payload) {
                Ok(events) => self.queued.extend(events.into_iter().map(Ok)),
                Err(error) => {
                    self.queued.push_back(Err(error));
                    self.drained = true;
                    return;
                }
            }
        }
        if self.translator.is_completed() {
            self.drained = true;
        }
    }
}

#[async_trait]
impl ModelStream for OpenAiCompatibleClient {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn tokens_per_char(&self) -> f64 {
        self.tokens_per_char
    }

    async fn stream(&self, request: ModelRequest) -> Result<EventStream> {
        let body = Self::body(&request);
        let mut req = self
            .client
            .post(&self.inference_url)
            .json(&body)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream");
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let res = req
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider_id))?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("{} API error {status}: {text}", self.provider_id));
        }
        tracing::debug!(
            provider = %self.provider_id,
            model = %request.model,
            "model stream opened"
        );

        let state = StreamState {
            bytes: res
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            decoder: SseDecoder::new(),
            translator: ChunkTranslator::new(),
            queued: VecDeque::new(),
            drained: false,
        };
        let events = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(next) = state.queued.pop_front() {
                    return Some((next, state));
                }
                if state.drained {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        let payloads = state.decoder.push(&chunk);
                        state.translate_all(payloads);
                    }
                    Some(Err(error)) => {
                        state
                            .queued
                            .push_back(Err(anyhow!(error).context("stream read error")));
                        state.drained = true;
                    }
                    None => {
                        let tail: Vec<String> = state.decoder.finish().into_iter().collect();
                        state.translate_all(tail);
                        if !state.drained {
                            let events = state.translator.finish();
                            state.queued.extend(events.into_iter().map(Ok));
                            state.drained = true;
                        }
                    }
                }
            }
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/llm_openai.rs"]
mod tests;
