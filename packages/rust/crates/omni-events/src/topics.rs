//! Event topic constants for type-safe routing.

/// Run accepted and stream requested
pub const RUN_STARTED: &str = "run/started";
/// Turn state machine moved to a new stage
pub const STAGE_CHANGE: &str = "run/stage";
/// Visible assistant text
pub const CONTENT_DELTA: &str = "content/delta";
/// Reasoning text or reasoning notices
pub const REASONING: &str = "reasoning";
/// Partial tool-call fragment from the stream
pub const TOOL_CALL_DELTA: &str = "tool/delta";
/// Tool dispatch began
pub const TOOL_STARTED: &str = "tool/started";
/// Tool dispatch reached a terminal status
pub const TOOL_FINISHED: &str = "tool/finished";
/// No stream activity within the heartbeat bound
pub const HEARTBEAT: &str = "liveness/heartbeat";
/// Turn lock held past the watchdog bound
pub const WATCHDOG: &str = "liveness/watchdog";
/// Degenerate (shaky) response detected
pub const SHAKY_RESPONSE: &str = "response/shaky";
/// File effects of the turn were rolled back
pub const ROLLED_BACK: &str = "files/rolled_back";
/// Turn evaluator decree
pub const DECREE: &str = "run/decree";
/// Run finished normally
pub const RUN_COMPLETED: &str = "run/completed";
/// Run aborted by a turn-level fault
pub const RUN_FAILED: &str = "run/failed";
/// Run cancelled by the caller
pub const RUN_CANCELLED: &str = "run/cancelled";
