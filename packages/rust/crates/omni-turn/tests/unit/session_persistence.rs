use super::*;
use crate::invocation::InvocationStatus;
use crate::session::{ToolOutcome, TurnSummary};

#[test]
fn session_ids_are_sanitized() {
    assert_eq!(sanitize("../etc/passwd"), "___etc_passwd");
    assert_eq!(sanitize("run-01_a"), "run-01_a");
    assert_eq!(sanitize(""), "default");
}

#[tokio::test]
async fn missing_snapshot_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RunStateRepository::new(dir.path().join("state"));
    assert_eq!(repo.load("fresh").await.unwrap(), None);
}

#[tokio::test]
async fn save_then_load_restores_state_and_memory() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RunStateRepository::new(dir.path().join("state"));

    let mut state = SessionRunState::new();
    state.record_turn(&TurnSummary {
        tools: vec![ToolOutcome {
            name: "write_file".to_string(),
            status: InvocationStatus::Error,
            target: Some("src/lib.rs".to_string()),
        }],
        shaky: false,
    });
    let memory = EvaluatorMemory {
        previous_confidence: Some(1.25),
        consecutive_successes: 3,
    };

    let path = repo.save("s1", &state, &memory).await.unwrap();
    assert!(path.ends_with("s1.json"));
    assert!(!path.with_extension("json.tmp").exists());

    let loaded = repo.load("s1").await.unwrap().unwrap();
    assert_eq!(loaded.version, SNAPSHOT_VERSION);
    assert_eq!(loaded.state, state);
    assert_eq!(loaded.evaluator, memory);
}

#[tokio::test]
async fn corrupt_snapshot_is_an_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RunStateRepository::new(dir.path());
    std::fs::write(repo.path_for("bad"), b"{ nope").unwrap();
    assert!(matches!(
        repo.load("bad").await,
        Err(IoError::Encoding(_))
    ));
}
