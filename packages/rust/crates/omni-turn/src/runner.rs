use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use omni_events::{EventBus, ProgressKind};
use omni_io::{FileStore, LocalFileStore};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use omni_turn::{
    ApprovalMode, ChatMessage, EngineConfig, RunStateRepository, SessionRunState, ToolDispatcher,
    ToolRegistry, TurnEngine, TurnOutcome, provider_factory, register_file_tools,
};

use crate::stdin_approval::StdinApproval;

const STATE_DIR: &str = ".omni-turn/state";
const EVENT_BUS_CAPACITY: usize = 1024;
const CONTINUE_PROMPT: &str = "continue";

pub(crate) struct RunRequest {
    pub(crate) query: String,
    pub(crate) workspace: PathBuf,
    pub(crate) max_turns: Option<u32>,
    pub(crate) auto_approve: bool,
    pub(crate) session: String,
}

pub(crate) async fn run_mode(
    mut config: EngineConfig,
    request: RunRequest,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if request.auto_approve {
        config.approval_mode = ApprovalMode::FullyAutonomous;
    }
    let max_turns = request.max_turns.unwrap_or(config.max_turns).max(1);
    let policy = config.autonomy;

    let model = provider_factory(&config.provider, config.tokens_per_char, env)?;
    let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&request.workspace));
    let mut registry = ToolRegistry::new();
    register_file_tools(&mut registry);
    let dispatcher = ToolDispatcher::new(Arc::new(registry))
        .with_approval(Arc::new(StdinApproval::new()));

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let printer = tokio::spawn(print_progress(bus.subscribe()));
    let engine = TurnEngine::new(model, files, dispatcher, config)?.with_sink(Arc::new(bus));

    let repository = RunStateRepository::new(request.workspace.join(STATE_DIR));
    let mut state = match repository.load(&request.session).await {
        Ok(Some(snapshot)) => {
            engine.restore_evaluator_memory(snapshot.evaluator);
            snapshot.state
        }
        Ok(None) => SessionRunState::new(),
        Err(error) => {
            tracing::warn!(
                session = %request.session,
                error = %error,
                "failed to load session run state; starting fresh"
            );
            SessionRunState::new()
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut history = vec![ChatMessage::user(request.query)];
    for turn in 1..=max_turns {
        let report = engine
            .run_turn(&history, &mut state, &cancel)
            .await
            .with_context(|| format!("turn {turn} failed"))?;
        history.extend(report.messages.iter().cloned());

        match report.outcome {
            TurnOutcome::Completed => {}
            TurnOutcome::Cancelled => {
                eprintln!(
                    "\n[cancelled] rolled back {} file(s)",
                    report.rolled_back.len()
                );
                break;
            }
            TurnOutcome::Recovered => {
                eprintln!(
                    "\n[recovered] watchdog fired; rolled back {} file(s)",
                    report.rolled_back.len()
                );
                break;
            }
        }

        repository
            .save(&request.session, &state, &engine.evaluator_memory())
            .await
            .context("failed to persist session run state")?;

        let Some(decree) = &report.decree else {
            break;
        };
        eprintln!(
            "\n[turn {turn}] {} / {} confidence {:.2} ({}) {}",
            decree.strategy.as_str(),
            decree.urgency.as_str(),
            decree.confidence,
            decree.stop_condition.as_str(),
            decree.rationale
        );
        if !decree.blocking_hotspots.is_empty() {
            eprintln!("  blocking: {}", decree.blocking_hotspots.join(", "));
        }
        if report.shaky {
            eprintln!("  response looked degenerate; returning control");
            break;
        }

        let continue_turn = report.response.has_tool_calls()
            && policy.should_continue(decree, report.shaky);
        if !continue_turn {
            break;
        }
        history.push(ChatMessage::user(CONTINUE_PROMPT));
    }

    drop(engine);
    let _ = printer.await;
    Ok(())
}

async fn print_progress(mut events: broadcast::Receiver<omni_events::ProgressEvent>) {
    let mut stdout = std::io::stdout();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event.kind {
            ProgressKind::ContentDelta { text } => {
                let _ = write!(stdout, "{text}");
                let _ = stdout.flush();
            }
            ProgressKind::ToolStarted { name, .. } => eprintln!("\n[tool] {name} ..."),
            ProgressKind::ToolFinished {
                name,
                status,
                declined,
                duration_ms,
                ..
            } => {
                let status = if declined { "declined" } else { status.as_str() };
                eprintln!("[tool] {name} {status} ({duration_ms} ms)");
            }
            ProgressKind::HeartbeatWarning { idle_ms } => {
                eprintln!("\n[waiting] no output for {}s; model may still be reasoning", idle_ms / 1000);
            }
            ProgressKind::WatchdogFired { held_ms } => {
                eprintln!("\n[watchdog] turn held for {}s; recovering", held_ms / 1000);
            }
            ProgressKind::RolledBack { paths } => {
                eprintln!("[rollback] restored {}", paths.join(", "));
            }
            ProgressKind::RunFailed { error } => eprintln!("\n[error] {error}"),
            _ => {}
        }
    }
}
