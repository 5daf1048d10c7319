//! Tool invocations and their lifecycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolFault;

/// Lifecycle of one invocation. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl InvocationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One structured request to run a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// Order in which the stream started this invocation.
    pub sequence: usize,
    /// Argument text exactly as streamed.
    pub raw_arguments: String,
    /// Parsed arguments, set once the argument block has ended.
    pub input: Option<Value>,
    pub status: InvocationStatus,
    pub output: Option<String>,
    pub fault: Option<ToolFault>,
    /// Operator declined approval. Status is `Completed` in that case.
    pub declined: bool,
    pub duration: Option<Duration>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sequence: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sequence,
            raw_arguments: String::new(),
            input: None,
            status: InvocationStatus::Pending,
            output: None,
            fault: None,
            declined: false,
            duration: None,
        }
    }

    /// Parse the buffered argument text.
    ///
    /// A parse failure marks the invocation as an error carrying
    /// `ToolFault::InvalidArguments`. Calling again after success is a no-op.
    pub fn finalize_arguments(&mut self) {
        if self.input.is_some() || self.status.is_terminal() {
            return;
        }
        match parse_arguments(&self.name, &self.raw_arguments) {
            Ok(value) => self.input = Some(value),
            Err(fault) => self.fail(fault, None),
        }
    }

    pub fn mark_running(&mut self) {
        self.status = InvocationStatus::Running;
    }

    pub fn complete(&mut self, output: String, duration: Option<Duration>) {
        self.status = InvocationStatus::Completed;
        self.output = Some(output);
        self.duration = duration;
    }

    pub fn decline(&mut self, duration: Option<Duration>) {
        self.declined = true;
        self.complete("declined by operator".to_string(), duration);
    }

    pub fn fail(&mut self, fault: ToolFault, duration: Option<Duration>) {
        self.status = InvocationStatus::Error;
        self.output = Some(fault.to_string());
        self.fault = Some(fault);
        self.duration = duration;
    }

    /// Arguments as JSON text for the assistant message echo.
    pub fn arguments_json(&self) -> String {
        match &self.input {
            Some(value) => value.to_string(),
            None => self.raw_arguments.clone(),
        }
    }

    /// The `path` argument, when present.
    pub fn path_argument(&self) -> Option<&str> {
        self.input.as_ref()?.get("path")?.as_str()
    }
}

/// Parse complete argument text into a JSON object.
///
/// Blank text is an empty object.
pub fn parse_arguments(tool: &str, raw: &str) -> Result<Value, ToolFault> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(ToolFault::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(error) => Err(ToolFault::InvalidArguments {
            tool: tool.to_string(),
            reason: error.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
