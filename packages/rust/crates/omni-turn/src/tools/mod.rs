//! Tool registry, approval, dispatch and the built-in file tools.

mod approval;
mod builtin;
mod dispatcher;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use omni_events::RunId;
use omni_io::FileStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use approval::{ApprovalMode, ApprovalRequester, AutoApprove};
pub use builtin::{AppendFileTool, DeleteFileTool, ReadFileTool, WriteFileTool, register_file_tools};
pub use dispatcher::{ToolDispatcher, validate_arguments};

/// Schema-described tool contract exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Names listed under the schema's `required` array.
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Per-dispatch context handed to tools.
#[derive(Clone)]
pub struct ToolContext {
    pub run_id: RunId,
    pub cancel: CancellationToken,
    pub files: Arc<dyn FileStore>,
}

/// One executable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Files this call will mutate. The engine backs each one up before the
    /// call runs.
    fn mutated_paths(&self, _input: &Value) -> Vec<String> {
        Vec::new()
    }

    /// Run the tool. An `Err` is recorded on the invocation; it never aborts
    /// the turn.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String>;
}

/// Name → tool map. Iteration is sorted by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
