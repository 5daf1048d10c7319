//! Error types for the turn engine.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use omni_events::RunId;
use thiserror::Error;

/// Per-invocation fault. Recorded on the invocation; never aborts a turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFault {
    /// No tool with this name is registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Required schema properties are absent. Lists every missing field.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { tool: String, missing: Vec<String> },

    /// Arguments did not parse as a JSON object.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool itself failed.
    #[error("{0}")]
    Execution(String),
}

/// Turn-level fault. File effects are rolled back before it is returned.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Another turn holds the engine lock.
    #[error("turn {0} is still active")]
    Busy(RunId),

    /// Network or protocol failure mid-stream.
    #[error("model stream failed: {0}")]
    Stream(String),

    /// The model request could not be started.
    #[error("model request failed: {0}")]
    Model(String),

    /// File store failure outside a tool invocation.
    #[error(transparent)]
    Io(#[from] omni_io::IoError),
}

/// Configuration and settings errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Provider id not present in the lookup table.
    #[error("unknown provider: {0} (known: {1})")]
    UnknownProvider(String, String),

    /// A value is outside its accepted range.
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}
