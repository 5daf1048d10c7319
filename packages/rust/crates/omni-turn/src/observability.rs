//! Stable structured-log event names.

/// Event names attached to `tracing` records as the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    TurnStarted,
    TurnStageChanged,
    TurnCompleted,
    TurnCancelled,
    TurnRecovered,
    TurnBusy,
    TurnStreamFault,
    TurnShakyResponse,
    TurnRolledBack,
    TurnRollbackFailed,
    TurnBackupsCleared,
    ToolCallStarted,
    ToolCallDropped,
    ToolCallRenamed,
    ToolArgumentsInvalid,
    ToolInlineNearMiss,
    ToolDispatchStarted,
    ToolDispatchCompleted,
    ToolDispatchDeclined,
    ToolDispatchFailed,
    ToolBackupFailed,
    LivenessHeartbeat,
    LivenessWatchdogFired,
    EvaluatorDecree,
    RunStatePersisted,
    RunStateLoaded,
    SettingsLoaded,
}

impl SessionEvent {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::TurnStarted => "turn.started",
            Self::TurnStageChanged => "turn.stage.changed",
            Self::TurnCompleted => "turn.completed",
            Self::TurnCancelled => "turn.cancelled",
            Self::TurnRecovered => "turn.recovered",
            Self::TurnBusy => "turn.busy",
            Self::TurnStreamFault => "turn.stream.fault",
            Self::TurnShakyResponse => "turn.response.shaky",
            Self::TurnRolledBack => "turn.files.rolled_back",
            Self::TurnRollbackFailed => "turn.files.rollback_failed",
            Self::TurnBackupsCleared => "turn.files.backups_cleared",
            Self::ToolCallStarted => "tool.call.started",
            Self::ToolCallDropped => "tool.call.dropped",
            Self::ToolCallRenamed => "tool.call.renamed",
            Self::ToolArgumentsInvalid => "tool.arguments.invalid",
            Self::ToolInlineNearMiss => "tool.inline.near_miss",
            Self::ToolDispatchStarted => "tool.dispatch.started",
            Self::ToolDispatchCompleted => "tool.dispatch.completed",
            Self::ToolDispatchDeclined => "tool.dispatch.declined",
            Self::ToolDispatchFailed => "tool.dispatch.failed",
            Self::ToolBackupFailed => "tool.backup.failed",
            Self::LivenessHeartbeat => "liveness.heartbeat.warning",
            Self::LivenessWatchdogFired => "turn.watchdog.fired",
            Self::EvaluatorDecree => "evaluator.decree",
            Self::RunStatePersisted => "session.run_state.persisted",
            Self::RunStateLoaded => "session.run_state.loaded",
            Self::SettingsLoaded => "config.settings.loaded",
        }
    }
}
