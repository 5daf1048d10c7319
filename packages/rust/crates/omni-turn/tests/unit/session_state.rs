use super::{INITIAL_PRESSURE, SessionRunState, ToolOutcome, TurnSummary};
use crate::invocation::InvocationStatus;

fn outcome(status: InvocationStatus, target: Option<&str>) -> ToolOutcome {
    ToolOutcome {
        name: "write_file".to_string(),
        status,
        target: target.map(str::to_string),
    }
}

#[test]
fn clean_turn_extends_streak_and_raises_pressure() {
    let mut state = SessionRunState::new();
    state.record_turn(&TurnSummary {
        tools: vec![outcome(InvocationStatus::Completed, Some("a.rs"))],
        shaky: false,
    });
    assert_eq!(state.victory_streak, 1);
    assert!((state.pressure - (INITIAL_PRESSURE + 5.0)).abs() < f64::EPSILON);
    assert_eq!(state.tool_history_len, 1);
    assert_eq!(state.turns, 1);
}

#[test]
fn error_resets_streak_and_tracks_hotspot() {
    let mut state = SessionRunState::new();
    state.victory_streak = 4;
    state.record_turn(&TurnSummary {
        tools: vec![
            outcome(InvocationStatus::Error, Some("a.rs")),
            outcome(InvocationStatus::Error, Some("a.rs")),
        ],
        shaky: false,
    });
    assert_eq!(state.victory_streak, 0);
    assert_eq!(state.total_errors, 2);
    assert!((state.pressure - 30.0).abs() < f64::EPSILON);
    assert_eq!(state.hotspots["a.rs"].count, 2);
}

#[test]
fn shaky_turn_resets_streak() {
    let mut state = SessionRunState::new();
    state.victory_streak = 2;
    state.record_turn(&TurnSummary {
        tools: Vec::new(),
        shaky: true,
    });
    assert_eq!(state.victory_streak, 0);
}

#[test]
fn pressure_is_clamped() {
    let mut state = SessionRunState::new();
    let failures = (0..20)
        .map(|_| outcome(InvocationStatus::Error, None))
        .collect();
    state.record_turn(&TurnSummary {
        tools: failures,
        shaky: false,
    });
    assert!(state.pressure.abs() < f64::EPSILON);
}

#[test]
fn blocking_hotspots_prefer_most_recent_and_cap() {
    let mut state = SessionRunState::new();
    for file in ["a", "b", "c", "d", "e", "f"] {
        let tools = (0..3)
            .map(|_| outcome(InvocationStatus::Error, Some(file)))
            .collect();
        state.record_turn(&TurnSummary {
            tools,
            shaky: false,
        });
    }
    state.record_turn(&TurnSummary {
        tools: vec![outcome(InvocationStatus::Error, Some("g"))],
        shaky: false,
    });
    assert_eq!(state.blocking_hotspots(3, 4), vec!["f", "e", "d", "c"]);
    assert!(!state.blocking_hotspots(3, 10).contains(&"g".to_string()));
}
