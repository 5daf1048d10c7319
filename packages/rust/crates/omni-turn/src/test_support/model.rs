use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::llm::{EventStream, ModelRequest, ModelStream, StreamEvent, Usage};

/// One scripted step of a response stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Event(StreamEvent),
    /// Yield a stream error and end.
    Fail(String),
    /// Never yield again.
    Hang,
    Sleep(Duration),
}

/// `ModelStream` that replays one script per call.
///
/// Calls beyond the last script get an immediately completed empty stream.
#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(scripts: impl IntoIterator<Item = Vec<ScriptStep>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ModelStream for ScriptedModel {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn tokens_per_char(&self) -> f64 {
        0.25
    }

    async fn stream(&self, request: ModelRequest) -> anyhow::Result<EventStream> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let steps: VecDeque<ScriptStep> = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| vec![ScriptStep::Event(StreamEvent::RunCompleted { usage: None })])
            .into();
        let stream = futures::stream::unfold(steps, |mut steps| async move {
            loop {
                match steps.pop_front()? {
                    ScriptStep::Event(event) => return Some((Ok(event), steps)),
                    ScriptStep::Fail(message) => {
                        steps.clear();
                        return Some((Err(anyhow::anyhow!(message)), steps));
                    }
                    ScriptStep::Hang => std::future::pending::<()>().await,
                    ScriptStep::Sleep(duration) => tokio::time::sleep(duration).await,
                }
            }
        });
        Ok(stream.boxed())
    }
}

/// Content deltas followed by completion with the given usage.
pub fn text_steps(chunks: &[&str], usage: Option<Usage>) -> Vec<ScriptStep> {
    let mut steps: Vec<ScriptStep> = chunks
        .iter()
        .map(|chunk| {
            ScriptStep::Event(StreamEvent::ContentDelta {
                text: (*chunk).to_string(),
            })
        })
        .collect();
    steps.push(ScriptStep::Event(StreamEvent::RunCompleted { usage }));
    steps
}

/// A streamed tool call: first delta carries id and name, the rest carry
/// argument fragments, then the block ends.
pub fn tool_call_steps(index: usize, id: &str, name: &str, fragments: &[&str]) -> Vec<ScriptStep> {
    let mut steps = vec![ScriptStep::Event(StreamEvent::ToolCallDelta {
        index,
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        arguments: None,
    })];
    steps.extend(fragments.iter().map(|fragment| {
        ScriptStep::Event(StreamEvent::ToolCallDelta {
            index,
            id: None,
            name: None,
            arguments: Some((*fragment).to_string()),
        })
    }));
    steps.push(ScriptStep::Event(StreamEvent::ToolCallEnd { index }));
    steps
}
