use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-turn")]
#[command(about = "Agentic turn engine: streamed tool calls, transactional file edits, deterministic evaluation.")]
pub(crate) struct Cli {
    /// Override config home (user settings live at `<conf>/omni-turn/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one request; continues autonomously while the evaluator allows.
    Run {
        /// User request for the first turn.
        #[arg(long)]
        query: String,

        /// Root for the file tools (default: current directory).
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Turn budget for this request (default: settings `session.max_turns`).
        #[arg(long)]
        max_turns: Option<u32>,

        /// Skip approval prompts.
        #[arg(long)]
        auto_approve: bool,

        /// Session id for persisted run state.
        #[arg(long, default_value = "default")]
        session: String,

        /// Debug logging (overridden by RUST_LOG).
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration as YAML.
    Settings,
}
