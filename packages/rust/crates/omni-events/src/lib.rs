//! Structured progress events for agent turns.
//!
//! The turn engine reports everything it does through a [`ProgressSink`], so
//! presentation layers (terminal, editor, HTTP) subscribe without the engine
//! depending on any of them.
//!
//! # Architecture
//!
//! ```text
//! TurnEngine ──emit(ProgressEvent)──▶ dyn ProgressSink
//!                                        ├── EventBus (broadcast fan-out)
//!                                        ├── closure sinks
//!                                        └── NullSink
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod topics;

/// Identifier for one turn run.
pub type RunId = u64;

/// How loudly a presentation layer should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What happened. Serialized with a `type` tag (`reasoning`, `stage_change`,
/// `tool_call_delta`, `run_completed`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressKind {
    RunStarted {
        model: String,
    },
    StageChange {
        stage: String,
    },
    ContentDelta {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
    ToolStarted {
        id: String,
        name: String,
    },
    ToolFinished {
        id: String,
        name: String,
        status: String,
        declined: bool,
        duration_ms: u64,
    },
    HeartbeatWarning {
        idle_ms: u64,
    },
    WatchdogFired {
        held_ms: u64,
    },
    ShakyResponse {
        text_chars: usize,
        reasoning_chars: usize,
    },
    RolledBack {
        paths: Vec<String>,
    },
    Decree {
        strategy: String,
        urgency: String,
        confidence: f64,
        stop_condition: String,
        rationale: String,
    },
    RunCompleted {
        input_tokens: u64,
        output_tokens: u64,
    },
    RunFailed {
        error: String,
    },
    Cancelled,
}

impl ProgressKind {
    /// Routing topic for this kind (see [`topics`]).
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => topics::RUN_STARTED,
            Self::StageChange { .. } => topics::STAGE_CHANGE,
            Self::ContentDelta { .. } => topics::CONTENT_DELTA,
            Self::Reasoning { .. } => topics::REASONING,
            Self::ToolCallDelta { .. } => topics::TOOL_CALL_DELTA,
            Self::ToolStarted { .. } => topics::TOOL_STARTED,
            Self::ToolFinished { .. } => topics::TOOL_FINISHED,
            Self::HeartbeatWarning { .. } => topics::HEARTBEAT,
            Self::WatchdogFired { .. } => topics::WATCHDOG,
            Self::ShakyResponse { .. } => topics::SHAKY_RESPONSE,
            Self::RolledBack { .. } => topics::ROLLED_BACK,
            Self::Decree { .. } => topics::DECREE,
            Self::RunCompleted { .. } => topics::RUN_COMPLETED,
            Self::RunFailed { .. } => topics::RUN_FAILED,
            Self::Cancelled => topics::RUN_CANCELLED,
        }
    }

    /// Default severity for this kind.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::WatchdogFired { .. } => Severity::Critical,
            Self::HeartbeatWarning { .. }
            | Self::ShakyResponse { .. }
            | Self::RolledBack { .. }
            | Self::RunFailed { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// One progress event emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Unique event identifier
    pub id: String,
    /// Run that produced the event
    pub run_id: RunId,
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
    /// Surfacing level
    pub severity: Severity,
    /// Event payload
    #[serde(flatten)]
    pub kind: ProgressKind,
    /// Wall-clock timestamp
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event with the kind's default severity.
    pub fn new(run_id: RunId, elapsed: Duration, kind: ProgressKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            severity: kind.severity(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Routing topic of the payload.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        self.kind.topic()
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] run={} +{}ms {}",
            self.timestamp.format("%H:%M:%S"),
            self.run_id,
            self.elapsed_ms,
            self.topic()
        )
    }
}

/// Receiver of progress events.
///
/// Implementations must not block: the engine emits from its turn loop.
pub trait ProgressSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Async fan-out bus for progress events
///
/// Uses `tokio::sync::broadcast` channel for:
/// - Thread-safe 1-to-Many fan-out
/// - Non-blocking publish
/// - Automatic cleanup on receiver drop
///
/// Owned per engine or session; there is no process-wide bus.
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast sender (clonable for multiple publishers)
    tx: broadcast::Sender<ProgressEvent>,
    /// Bus capacity for backpressure handling
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Get the bus capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers who received the event.
    /// Returns 0 if there are no subscribers (not an error).
    pub fn publish(&self, event: ProgressEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to the event bus
    ///
    /// Returns a receiver that will receive all future events.
    /// Dropping the receiver automatically unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Get current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ProgressSink for EventBus {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.publish(event);
    }
}
