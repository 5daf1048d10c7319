//! omni-turn CLI: run a request through the turn engine, or print settings.
//!
//! Settings: `<PRJ_ROOT>/packages/conf/settings.yaml`, then
//! `<config home>/omni-turn/settings.yaml`, then `OMNI_TURN_*` variables.
//!
//! Logging: set `RUST_LOG=omni_turn=debug` to see engine logs on stderr.

mod cli;
mod runner;
mod stdin_approval;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_turn::{load_turn_settings_from_paths, settings_paths};

use crate::cli::{Cli, Command};
use crate::runner::{RunRequest, run_mode};

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose on run => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let verbose = matches!(&cli.command, Command::Run { verbose: true, .. });
        EnvFilter::new(if verbose {
            "omni_turn=debug"
        } else {
            "omni_turn=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let project_root = match env_lookup("PRJ_ROOT") {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };
    let config_home = cli
        .conf
        .clone()
        .or_else(|| env_lookup("PRJ_CONFIG_HOME").map(PathBuf::from));
    let (system_path, user_path) = settings_paths(&project_root, config_home.as_deref());
    let config = load_turn_settings_from_paths(&system_path, &user_path)
        .apply_env(&env_lookup)
        .into_engine_config()?;

    match cli.command {
        Command::Settings => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Command::Run {
            query,
            workspace,
            max_turns,
            auto_approve,
            session,
            verbose: _,
        } => {
            run_mode(
                config,
                RunRequest {
                    query,
                    workspace,
                    max_turns,
                    auto_approve,
                    session,
                },
                &env_lookup,
            )
            .await
        }
    }
}
