//! Human approval before a tool runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// When the dispatcher asks for approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Ask the requester before every tool.
    #[default]
    Ask,
    /// Bypass approval entirely.
    FullyAutonomous,
}

impl ApprovalMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::FullyAutonomous => "fully_autonomous",
        }
    }
}

/// Asynchronous yes/no decision keyed on tool name and arguments.
///
/// `false` is a legitimate decline, not an error.
#[async_trait]
pub trait ApprovalRequester: Send + Sync {
    async fn request(&self, tool: &str, input: &Value) -> bool;
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalRequester for AutoApprove {
    async fn request(&self, _tool: &str, _input: &Value) -> bool {
        true
    }
}
