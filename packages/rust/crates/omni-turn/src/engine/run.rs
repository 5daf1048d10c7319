use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use omni_events::{ProgressEvent, ProgressKind, RunId};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{TurnEngine, TurnOutcome, TurnReport, TurnState};
use crate::error::{EngineError, ToolFault};
use crate::invocation::{InvocationStatus, ToolInvocation};
use crate::liveness::{LivenessMonitor, RecoveryFn};
use crate::llm::{ModelRequest, StreamEvent, Usage};
use crate::observability::SessionEvent;
use crate::response::{ContentBlock, ResponseView};
use crate::session::{
    ChatMessage, FunctionCall, SessionRunState, ToolCallOut, ToolOutcome, TurnSummary,
};
use crate::stream::{InlineOutput, InlineToolFilter, NearMiss, ToolCallAssembler};
use crate::tools::ToolContext;

/// Per-turn handles shared by the phases of one run.
struct ActiveTurn<'a> {
    run_id: RunId,
    started: Instant,
    cancel: CancellationToken,
    recovered: Arc<AtomicBool>,
    monitor: &'a LivenessMonitor,
}

impl ActiveTurn<'_> {
    fn interrupted_outcome(&self) -> TurnOutcome {
        if self.recovered.load(Ordering::SeqCst) {
            TurnOutcome::Recovered
        } else {
            TurnOutcome::Cancelled
        }
    }
}

/// Text, reasoning and tool calls collected from the stream.
#[derive(Default)]
struct TurnBuffers {
    text: String,
    reasoning: String,
    assembler: ToolCallAssembler,
    usage: Option<Usage>,
    near_misses: Vec<NearMiss>,
}

enum StreamStop {
    Interrupted,
    Fault(String),
}

/// Releases the turn lock on every exit path, including a dropped future.
struct LockGuard<'a> {
    engine: &'a TurnEngine,
    run_id: RunId,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let released = self.engine.lock.release(self.run_id);
        if released || self.engine.lock.holder().is_none() {
            self.engine.set_state(TurnState::Idle);
        }
    }
}

impl TurnEngine {
    /// Run one turn over `history`.
    ///
    /// Pending backups from an earlier, unaccepted turn are accepted first.
    /// Cancellation and watchdog recovery roll back file effects and return
    /// `Ok` with the matching [`TurnOutcome`]; `session` is only updated by
    /// completed turns.
    ///
    /// # Errors
    /// `EngineError::Busy` while another turn holds the lock;
    /// `EngineError::Stream` after rollback when the model stream fails.
    pub async fn run_turn(
        &self,
        history: &[ChatMessage],
        session: &mut SessionRunState,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, EngineError> {
        let run_id = self.next_run_id();
        if let Err(error) = self.lock.acquire(run_id) {
            tracing::warn!(
                event = SessionEvent::TurnBusy.as_str(),
                run_id,
                error = %error,
                "turn rejected; engine busy"
            );
            return Err(error);
        }
        let _guard = LockGuard {
            engine: self,
            run_id,
        };

        let pending = self.files.backed_up_paths();
        if !pending.is_empty() {
            self.files.clear_backups().await;
            tracing::info!(
                event = SessionEvent::TurnBackupsCleared.as_str(),
                run_id,
                files = pending.len(),
                "previous turn implicitly accepted"
            );
        }

        let turn_cancel = cancel.child_token();
        let recovered = Arc::new(AtomicBool::new(false));
        let recovery: RecoveryFn = {
            let recovered = Arc::clone(&recovered);
            let token = turn_cancel.clone();
            let lock = Arc::clone(&self.lock);
            Arc::new(move || {
                recovered.store(true, Ordering::SeqCst);
                token.cancel();
                lock.force_release();
            })
        };
        let mut monitor =
            LivenessMonitor::start(self.liveness, run_id, Arc::clone(&self.sink), recovery);
        let turn = ActiveTurn {
            run_id,
            started: Instant::now(),
            cancel: turn_cancel,
            recovered,
            monitor: &monitor,
        };
        let result = self.drive(&turn, history, session).await;
        drop(turn);
        monitor.stop();
        result
    }

    #[allow(clippy::too_many_lines)]
    async fn drive(
        &self,
        turn: &ActiveTurn<'_>,
        history: &[ChatMessage],
        session: &mut SessionRunState,
    ) -> Result<TurnReport, EngineError> {
        tracing::info!(
            event = SessionEvent::TurnStarted.as_str(),
            run_id = turn.run_id,
            model = %self.config.model,
            history = history.len(),
            "turn started"
        );
        self.emit(
            turn,
            ProgressKind::RunStarted {
                model: self.config.model.clone(),
            },
        );
        self.transition(turn, TurnState::Streaming);

        let request = ModelRequest {
            model: self.config.model.clone(),
            system: self.config.system_prompt.clone(),
            messages: history.to_vec(),
            tools: self.dispatcher.registry().definitions(),
            max_tokens: self.config.max_tokens,
        };
        let mut buffers = TurnBuffers::default();
        match self.consume_stream(turn, request, &mut buffers).await {
            Ok(()) => {}
            Err(StreamStop::Interrupted) => {
                let invocations = buffers.assembler.finish();
                return Ok(self
                    .unwind(turn, buffers.text, buffers.reasoning, invocations, buffers.usage)
                    .await);
            }
            Err(StreamStop::Fault(message)) => {
                tracing::error!(
                    event = SessionEvent::TurnStreamFault.as_str(),
                    run_id = turn.run_id,
                    error = %message,
                    "model stream failed; rolling back"
                );
                self.rollback(turn).await;
                self.transition(turn, TurnState::RolledBack);
                self.emit(
                    turn,
                    ProgressKind::RunFailed {
                        error: message.clone(),
                    },
                );
                return Err(EngineError::Stream(message));
            }
        }

        self.transition(turn, TurnState::AssemblingTools);
        let TurnBuffers {
            text,
            reasoning,
            assembler,
            usage,
            near_misses,
        } = buffers;
        let mut invocations = assembler.finish();
        for invocation in invocations.iter().filter(|i| i.status == InvocationStatus::Error) {
            tracing::warn!(
                event = SessionEvent::ToolArgumentsInvalid.as_str(),
                run_id = turn.run_id,
                tool = %invocation.name,
                call_id = %invocation.id,
                error = invocation.output.as_deref().unwrap_or_default(),
                "tool call arguments rejected"
            );
        }

        self.transition(turn, TurnState::DispatchingTools);
        if !self.dispatch_all(turn, &mut invocations).await {
            return Ok(self.unwind(turn, text, reasoning, invocations, usage).await);
        }

        self.transition(turn, TurnState::Evaluating);
        if self.config.auto_accept {
            self.files.clear_backups().await;
        }
        let response = build_response(text.clone(), reasoning, &invocations);
        let shaky = response.is_shaky();
        if shaky {
            tracing::warn!(
                event = SessionEvent::TurnShakyResponse.as_str(),
                run_id = turn.run_id,
                text_chars = response.trimmed_text().chars().count(),
                reasoning_chars = response.reasoning().chars().count(),
                "degenerate model response"
            );
            self.emit(
                turn,
                ProgressKind::ShakyResponse {
                    text_chars: response.trimmed_text().chars().count(),
                    reasoning_chars: response.reasoning().chars().count(),
                },
            );
        }

        session.record_turn(&TurnSummary {
            tools: invocations
                .iter()
                .map(|invocation| ToolOutcome {
                    name: invocation.name.clone(),
                    status: invocation.status,
                    target: invocation.path_argument().map(str::to_string),
                })
                .collect(),
            shaky,
        });
        let decree = self.evaluator.evaluate(history, session);
        self.emit(
            turn,
            ProgressKind::Decree {
                strategy: decree.strategy.as_str().to_string(),
                urgency: decree.urgency.as_str().to_string(),
                confidence: decree.confidence,
                stop_condition: decree.stop_condition.as_str().to_string(),
                rationale: decree.rationale.clone(),
            },
        );

        let totals = usage.unwrap_or_else(|| Usage {
            input_tokens: history
                .iter()
                .map(|message| self.model.estimate_tokens(message.text()))
                .sum(),
            output_tokens: self.model.estimate_tokens(&text),
        });
        self.emit(
            turn,
            ProgressKind::RunCompleted {
                input_tokens: totals.input_tokens,
                output_tokens: totals.output_tokens,
            },
        );
        let elapsed = turn.started.elapsed();
        tracing::info!(
            event = SessionEvent::TurnCompleted.as_str(),
            run_id = turn.run_id,
            tools = invocations.len(),
            shaky,
            strategy = decree.strategy.as_str(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "turn completed"
        );

        Ok(TurnReport {
            run_id: turn.run_id,
            outcome: TurnOutcome::Completed,
            messages: turn_messages(&text, &invocations),
            response,
            invocations,
            decree: Some(decree),
            shaky,
            usage,
            rolled_back: Vec::new(),
            near_misses,
            elapsed,
        })
    }

    async fn consume_stream(
        &self,
        turn: &ActiveTurn<'_>,
        request: ModelRequest,
        buffers: &mut TurnBuffers,
    ) -> Result<(), StreamStop> {
        let opened = tokio::select! {
            biased;
            () = turn.cancel.cancelled() => return Err(StreamStop::Interrupted),
            opened = self.model.stream(request) => opened,
        };
        let mut events = opened.map_err(|error| StreamStop::Fault(format!("{error:#}")))?;
        let mut filter = InlineToolFilter::new(Arc::clone(&self.matcher));

        loop {
            let next = tokio::select! {
                biased;
                () = turn.cancel.cancelled() => return Err(StreamStop::Interrupted),
                next = events.next() => next,
            };
            let Some(event) = next else {
                break;
            };
            let event = event.map_err(|error| StreamStop::Fault(format!("{error:#}")))?;
            turn.monitor.touch();
            match event {
                StreamEvent::RunStarted { .. } => {}
                StreamEvent::StageChange { stage } => {
                    self.emit(turn, ProgressKind::StageChange { stage });
                }
                StreamEvent::ContentDelta { text } => {
                    let output = filter.push(&text);
                    self.absorb_inline(turn, output, buffers);
                }
                StreamEvent::ReasoningDelta { text } => {
                    buffers.reasoning.push_str(&text);
                    self.emit(turn, ProgressKind::Reasoning { text });
                }
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    buffers.assembler.push_delta(
                        index,
                        id.as_deref(),
                        name.as_deref(),
                        arguments.as_deref(),
                    );
                    self.emit(
                        turn,
                        ProgressKind::ToolCallDelta {
                            index,
                            id,
                            name,
                            arguments,
                        },
                    );
                }
                StreamEvent::ToolCallEnd { index } => buffers.assembler.end_block(index),
                StreamEvent::Usage(usage) => buffers.usage = Some(usage),
                StreamEvent::RunCompleted { usage } => {
                    if usage.is_some() {
                        buffers.usage = usage;
                    }
                    break;
                }
            }
        }

        let mut output = filter.finish();
        buffers.near_misses = std::mem::take(&mut output.near_misses);
        self.absorb_inline(turn, output, buffers);
        Ok(())
    }

    fn absorb_inline(
        &self,
        turn: &ActiveTurn<'_>,
        output: InlineOutput,
        buffers: &mut TurnBuffers,
    ) {
        if !output.visible.is_empty() {
            buffers.text.push_str(&output.visible);
            self.emit(
                turn,
                ProgressKind::ContentDelta {
                    text: output.visible,
                },
            );
        }
        for call in output.calls {
            let name = call.name.unwrap_or_default();
            let sequence = buffers
                .assembler
                .push_complete(call.id.as_deref(), &name, &call.arguments);
            tracing::debug!(
                event = SessionEvent::ToolCallStarted.as_str(),
                run_id = turn.run_id,
                sequence,
                tool = %name,
                source = "inline",
                "inline tool call recovered"
            );
        }
    }

    /// Dispatch in start order. Returns `false` when the turn was interrupted.
    async fn dispatch_all(
        &self,
        turn: &ActiveTurn<'_>,
        invocations: &mut [ToolInvocation],
    ) -> bool {
        let ctx = ToolContext {
            run_id: turn.run_id,
            cancel: turn.cancel.clone(),
            files: Arc::clone(&self.files),
        };
        for invocation in invocations.iter_mut() {
            if turn.cancel.is_cancelled() {
                return false;
            }
            if invocation.status.is_terminal() {
                self.emit_finished(turn, invocation);
                continue;
            }
            if let Err(error) = self.backup_targets(invocation).await {
                tracing::warn!(
                    event = SessionEvent::ToolBackupFailed.as_str(),
                    run_id = turn.run_id,
                    tool = %invocation.name,
                    call_id = %invocation.id,
                    error = %error,
                    "backup failed; tool not run"
                );
                invocation.fail(ToolFault::Execution(format!("backup failed: {error}")), None);
                self.emit_finished(turn, invocation);
                continue;
            }

            self.emit(
                turn,
                ProgressKind::ToolStarted {
                    id: invocation.id.clone(),
                    name: invocation.name.clone(),
                },
            );
            let finished = tokio::select! {
                biased;
                () = turn.cancel.cancelled() => false,
                () = self.dispatcher.dispatch(invocation, &ctx) => true,
            };
            if !finished {
                invocation.fail(ToolFault::Execution("cancelled".to_string()), None);
                return false;
            }
            turn.monitor.touch();
            self.emit_finished(turn, invocation);
        }
        !turn.cancel.is_cancelled()
    }

    async fn backup_targets(&self, invocation: &ToolInvocation) -> Result<(), omni_io::IoError> {
        for path in self.dispatcher.mutated_paths(invocation) {
            self.files.backup_file(&path).await?;
        }
        Ok(())
    }

    /// Roll back after cancellation or watchdog recovery.
    async fn unwind(
        &self,
        turn: &ActiveTurn<'_>,
        text: String,
        reasoning: String,
        invocations: Vec<ToolInvocation>,
        usage: Option<Usage>,
    ) -> TurnReport {
        let outcome = turn.interrupted_outcome();
        let rolled_back = self.rollback(turn).await;
        match outcome {
            TurnOutcome::Recovered => {
                self.transition(turn, TurnState::Recovered);
                tracing::warn!(
                    event = SessionEvent::TurnRecovered.as_str(),
                    run_id = turn.run_id,
                    rolled_back = rolled_back.len(),
                    "turn recovered after watchdog"
                );
            }
            TurnOutcome::Cancelled | TurnOutcome::Completed => {
                self.transition(turn, TurnState::RolledBack);
                tracing::info!(
                    event = SessionEvent::TurnCancelled.as_str(),
                    run_id = turn.run_id,
                    rolled_back = rolled_back.len(),
                    "turn cancelled"
                );
                self.emit(turn, ProgressKind::Cancelled);
            }
        }
        TurnReport {
            run_id: turn.run_id,
            outcome,
            response: build_response(text, reasoning, &invocations),
            invocations,
            decree: None,
            shaky: false,
            usage,
            rolled_back,
            near_misses: Vec::new(),
            elapsed: turn.started.elapsed(),
            messages: Vec::new(),
        }
    }

    async fn rollback(&self, turn: &ActiveTurn<'_>) -> Vec<String> {
        let backed_up = self.files.backed_up_paths();
        let restored = match self.files.rollback_all().await {
            Ok(paths) => paths,
            Err(error) => {
                tracing::error!(
                    event = SessionEvent::TurnRollbackFailed.as_str(),
                    run_id = turn.run_id,
                    error = %error,
                    "rollback incomplete"
                );
                backed_up
            }
        };
        if !restored.is_empty() {
            tracing::info!(
                event = SessionEvent::TurnRolledBack.as_str(),
                run_id = turn.run_id,
                files = restored.len(),
                "file effects rolled back"
            );
            self.emit(
                turn,
                ProgressKind::RolledBack {
                    paths: restored.clone(),
                },
            );
        }
        restored
    }

    fn emit_finished(&self, turn: &ActiveTurn<'_>, invocation: &ToolInvocation) {
        self.emit(
            turn,
            ProgressKind::ToolFinished {
                id: invocation.id.clone(),
                name: invocation.name.clone(),
                status: invocation.status.as_str().to_string(),
                declined: invocation.declined,
                duration_ms: invocation
                    .duration
                    .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            },
        );
    }

    fn transition(&self, turn: &ActiveTurn<'_>, next: TurnState) {
        let previous = self.set_state(next);
        tracing::debug!(
            event = SessionEvent::TurnStageChanged.as_str(),
            run_id = turn.run_id,
            from = previous.as_str(),
            to = next.as_str(),
            "turn state changed"
        );
        self.emit(
            turn,
            ProgressKind::StageChange {
                stage: next.as_str().to_string(),
            },
        );
    }

    fn emit(&self, turn: &ActiveTurn<'_>, kind: ProgressKind) {
        self.sink
            .emit(ProgressEvent::new(turn.run_id, turn.started.elapsed(), kind));
    }
}

fn build_response(text: String, reasoning: String, invocations: &[ToolInvocation]) -> ResponseView {
    let mut blocks = Vec::new();
    if !reasoning.is_empty() {
        blocks.push(ContentBlock::Reasoning { text: reasoning });
    }
    if !text.is_empty() {
        blocks.push(ContentBlock::Text { text });
    }
    for invocation in invocations {
        blocks.push(ContentBlock::ToolUse {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            input: invocation.input.clone().unwrap_or(Value::Null),
        });
    }
    ResponseView::new(blocks)
}

fn turn_messages(text: &str, invocations: &[ToolInvocation]) -> Vec<ChatMessage> {
    let mut assistant = ChatMessage::assistant(text);
    if text.is_empty() {
        assistant.content = None;
    }
    if !invocations.is_empty() {
        assistant.tool_calls = Some(
            invocations
                .iter()
                .map(|invocation| ToolCallOut {
                    id: invocation.id.clone(),
                    typ: "function".to_string(),
                    function: FunctionCall {
                        name: invocation.name.clone(),
                        arguments: invocation.arguments_json(),
                    },
                })
                .collect(),
        );
    }
    let mut messages = vec![assistant];
    messages.extend(invocations.iter().map(|invocation| {
        ChatMessage::tool_result(
            invocation.id.clone(),
            invocation.name.clone(),
            invocation.output.clone().unwrap_or_default(),
        )
    }));
    messages
}
