use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::{ApprovalRequester, Tool, ToolContext, ToolDefinition};

/// Configurable tool that journals its calls.
///
/// A writing stub stores `content` at `path` through the turn's file store
/// and declares `path` as mutated.
pub struct StubTool {
    name: String,
    required: Vec<String>,
    writes: bool,
    fail_with: Option<String>,
    delay: Option<Duration>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl StubTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: Vec::new(),
            writes: false,
            fail_with: None,
            delay: None,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn requiring(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|field| (*field).to_string()).collect();
        self
    }

    #[must_use]
    pub fn writing(mut self) -> Self {
        self.writes = true;
        self.required = vec!["path".to_string(), "content".to_string()];
        self
    }

    #[must_use]
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Share a call journal between stubs to observe global order.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = journal;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Tool for StubTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: format!("stub {}", self.name),
            input_schema: json!({ "type": "object", "required": self.required }),
        }
    }

    fn mutated_paths(&self, input: &Value) -> Vec<String> {
        if !self.writes {
            return Vec::new();
        }
        input
            .get("path")
            .and_then(Value::as_str)
            .map(|path| vec![path.to_string()])
            .unwrap_or_default()
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.name.clone());
        if self.writes {
            let path = input.get("path").and_then(Value::as_str).unwrap_or_default();
            let content = input.get("content").and_then(Value::as_str).unwrap_or_default();
            ctx.files.write_file(path, content, &ctx.cancel, None).await?;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        Ok(format!("{} ok", self.name))
    }
}

/// Answers approval requests from a queue; approves once the queue is empty.
#[derive(Default)]
pub struct ScriptedApproval {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedApproval {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Tool names asked about, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ApprovalRequester for ScriptedApproval {
    async fn request(&self, tool: &str, _input: &Value) -> bool {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tool.to_string());
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(true)
    }
}
