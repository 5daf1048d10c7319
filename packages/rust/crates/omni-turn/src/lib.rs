//! omni-turn: agentic turn engine.
//!
//! - **Streaming**: model stream events → tool-call assembly (including inline
//!   `<tool_call>` markup recovery) → normalized response.
//! - **Dispatch**: schema validation → approval → execution, with every
//!   mutated file backed up first so a failed or cancelled turn rolls back.
//! - **Liveness**: heartbeat warnings and a watchdog that recovers zombie turns.
//! - **Evaluation**: deterministic decree (strategy, urgency, confidence) from
//!   session run state instead of an extra model call.
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-turn/src/
//! ├── lib.rs            # Re-exports (this file)
//! ├── error.rs          # ToolFault, EngineError, ConfigError
//! ├── observability.rs  # SessionEvent names for tracing
//! ├── invocation.rs     # ToolInvocation lifecycle
//! ├── response.rs       # ResponseView, shaky classification
//! ├── liveness.rs       # LivenessMonitor
//! ├── llm/              # ModelStream port, OpenAI-compatible client, provider table
//! ├── stream/           # ToolCallAssembler, InlineToolFilter
//! ├── tools/            # Tool, ToolRegistry, ToolDispatcher, file tools
//! ├── evaluator/        # evaluate(), TurnEvaluator, AutonomyPolicy
//! ├── session/          # ChatMessage, SessionRunState, RunStateRepository
//! ├── config/           # EngineConfig, TurnSettings (YAML)
//! └── engine/           # TurnEngine state machine, TurnLock
//! ```

#![allow(missing_docs)]

mod config;
mod engine;
mod error;
mod evaluator;
mod invocation;
mod liveness;
mod llm;
mod observability;
mod response;
mod session;
mod stream;
#[doc(hidden)]
pub mod test_support;
mod tools;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use config::{
    EngineConfig, LivenessBounds, LivenessSettings, ModelSettings, ProviderConfig,
    ProviderSettings, SessionSettings, TurnSettings, load_turn_settings_from_paths,
    settings_paths,
};
pub use engine::{TurnEngine, TurnLock, TurnOutcome, TurnReport, TurnState};
pub use error::{ConfigError, EngineError, ToolFault};
pub use evaluator::{
    AutonomyPolicy, Evaluation, EvaluatorConfig, EvaluatorMemory, Profile, StopCondition,
    Strategy, TurnDecree, TurnEvaluator, Urgency, evaluate,
};
pub use invocation::{InvocationStatus, ToolInvocation, parse_arguments};
pub use liveness::{LivenessConfig, LivenessMonitor, RecoveryFn};
pub use llm::{
    ChunkTranslator, EventStream, ModelRequest, ModelStream, OpenAiCompatibleClient, PROVIDERS,
    ProviderEntry, ProviderParams, SseDecoder, StreamEvent, Usage, estimate_tokens,
    provider_factory,
};
pub use response::{
    ContentBlock, RawResponse, ResponseView, SHAKY_MIN_CHARS, ToolUse, is_shaky_parts,
};
pub use session::{
    ChatMessage, FunctionCall, Hotspot, INITIAL_PRESSURE, PersistedRunState, RunStateRepository,
    SessionRunState, ToolCallOut, ToolOutcome, TurnSummary,
};
pub use stream::{
    DeltaOutcome, INLINE_MARKERS, InlineCall, InlineOutput, InlineToolFilter, NearMiss,
    ToolCallAssembler,
};
pub use tools::{
    AppendFileTool, ApprovalMode, ApprovalRequester, AutoApprove, DeleteFileTool, ReadFileTool,
    Tool, ToolContext, ToolDefinition, ToolDispatcher, ToolRegistry, WriteFileTool,
    register_file_tools, validate_arguments,
};
