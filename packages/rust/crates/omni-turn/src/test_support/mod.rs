//! Test doubles for integration tests: a scripted model stream, a recording
//! progress sink, scripted approval and stub tools.

mod model;
mod sink;
mod tools;

pub use model::{ScriptStep, ScriptedModel, text_steps, tool_call_steps};
pub use sink::RecordingSink;
pub use tools::{StubTool, ScriptedApproval};
