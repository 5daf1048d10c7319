//! Turn engine: one streamed model call, tool dispatch, evaluation.

mod lock;
mod run;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use omni_events::{NullSink, ProgressSink, RunId};
use omni_io::FileStore;
use omni_tags::TagMatcher;

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::evaluator::{EvaluatorMemory, TurnDecree, TurnEvaluator};
use crate::invocation::ToolInvocation;
use crate::liveness::LivenessConfig;
use crate::llm::{ModelStream, Usage};
use crate::observability::SessionEvent;
use crate::response::ResponseView;
use crate::session::ChatMessage;
use crate::stream::{InlineToolFilter, NearMiss};
use crate::tools::ToolDispatcher;

pub use lock::TurnLock;

/// Engine state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    AssemblingTools,
    DispatchingTools,
    Evaluating,
    RolledBack,
    Recovered,
}

impl TurnState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::AssemblingTools => "assembling_tools",
            Self::DispatchingTools => "dispatching_tools",
            Self::Evaluating => "evaluating",
            Self::RolledBack => "rolled_back",
            Self::Recovered => "recovered",
        }
    }
}

/// How a turn ended without an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    /// Caller cancelled; file effects were rolled back.
    Cancelled,
    /// Watchdog fired; file effects were rolled back.
    Recovered,
}

/// Everything a finished turn produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub run_id: RunId,
    pub outcome: TurnOutcome,
    pub response: ResponseView,
    /// In dispatch (stream start) order.
    pub invocations: Vec<ToolInvocation>,
    /// Only for completed turns.
    pub decree: Option<TurnDecree>,
    pub shaky: bool,
    pub usage: Option<Usage>,
    /// Paths restored by rollback.
    pub rolled_back: Vec<String>,
    pub near_misses: Vec<NearMiss>,
    pub elapsed: Duration,
    /// Assistant message and tool results to append to the history.
    pub messages: Vec<ChatMessage>,
}

/// Drives turns against one model backend and one file store.
pub struct TurnEngine {
    model: Arc<dyn ModelStream>,
    files: Arc<dyn FileStore>,
    dispatcher: ToolDispatcher,
    evaluator: TurnEvaluator,
    sink: Arc<dyn ProgressSink>,
    config: EngineConfig,
    liveness: LivenessConfig,
    matcher: Arc<TagMatcher>,
    lock: Arc<TurnLock>,
    state: Mutex<TurnState>,
    next_run: AtomicU64,
}

impl TurnEngine {
    /// # Errors
    /// `ConfigError` when `config` does not validate.
    pub fn new(
        model: Arc<dyn ModelStream>,
        files: Arc<dyn FileStore>,
        dispatcher: ToolDispatcher,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let matcher = InlineToolFilter::default_matcher().map_err(|error| ConfigError::Invalid {
            field: "inline_markers".to_string(),
            reason: error.to_string(),
        })?;
        let dispatcher = dispatcher.with_mode(config.approval_mode);
        Ok(Self {
            model,
            files,
            dispatcher,
            evaluator: TurnEvaluator::new(config.evaluator.clone()),
            sink: Arc::new(NullSink),
            liveness: config.liveness.to_config(),
            config,
            matcher,
            lock: Arc::new(TurnLock::new()),
            state: Mutex::new(TurnState::Idle),
            next_run: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the liveness bounds derived from the config.
    #[must_use]
    pub fn with_liveness(mut self, liveness: LivenessConfig) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> TurnState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run id of the turn holding the lock, if any.
    pub fn active_run(&self) -> Option<RunId> {
        self.lock.holder()
    }

    pub fn evaluator_memory(&self) -> EvaluatorMemory {
        self.evaluator.memory()
    }

    pub fn restore_evaluator_memory(&self, memory: EvaluatorMemory) {
        self.evaluator.restore(memory);
    }

    /// Keep the last turn's file changes (discard backups).
    ///
    /// # Errors
    /// `EngineError::Busy` while a turn is running.
    pub async fn accept_turn(&self) -> Result<Vec<String>, EngineError> {
        self.ensure_idle()?;
        let paths = self.files.backed_up_paths();
        self.files.clear_backups().await;
        tracing::info!(
            event = SessionEvent::TurnBackupsCleared.as_str(),
            files = paths.len(),
            "turn accepted"
        );
        Ok(paths)
    }

    /// Undo the last turn's file changes.
    ///
    /// # Errors
    /// `EngineError::Busy` while a turn is running, `EngineError::Io` when a
    /// restore fails (every path is still attempted).
    pub async fn revert_turn(&self) -> Result<Vec<String>, EngineError> {
        self.ensure_idle()?;
        let paths = self.files.rollback_all().await?;
        tracing::info!(
            event = SessionEvent::TurnRolledBack.as_str(),
            files = paths.len(),
            "turn reverted"
        );
        Ok(paths)
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        match self.lock.holder() {
            Some(run_id) => Err(EngineError::Busy(run_id)),
            None => Ok(()),
        }
    }

    fn next_run_id(&self) -> RunId {
        self.next_run.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_state(&self, next: TurnState) -> TurnState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *state, next)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine_state.rs"]
mod tests;
