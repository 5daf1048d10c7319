//! Session namespace: chat messages, cross-turn run state and its persistence.

mod message;
mod persistence;
mod state;

pub use message::{ChatMessage, FunctionCall, ToolCallOut};
pub use persistence::{PersistedRunState, RunStateRepository};
pub use state::{Hotspot, INITIAL_PRESSURE, SessionRunState, ToolOutcome, TurnSummary};
