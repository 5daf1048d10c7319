use super::*;
use crate::invocation::InvocationStatus;
use crate::session::{ToolOutcome, TurnSummary};

fn close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn state(errors: u32, streak: u32, pressure: f64) -> SessionRunState {
    let mut state = SessionRunState::new();
    state.total_errors = errors;
    state.victory_streak = streak;
    state.pressure = pressure;
    state
}

fn run(history: &[ChatMessage], state: &SessionRunState, memory: &EvaluatorMemory) -> Evaluation {
    evaluate(history, state, &EvaluatorConfig::default(), memory)
}

#[test]
fn fresh_session_executes_at_nominal_confidence() {
    let out = run(&[], &SessionRunState::new(), &EvaluatorMemory::default());
    assert_eq!(out.decree.strategy, Strategy::Execute);
    assert_eq!(out.decree.urgency, Urgency::Medium);
    assert_eq!(out.decree.stop_condition, StopCondition::Landed);
    close(out.decree.confidence, 1.5);
    assert_eq!(out.memory.previous_confidence, Some(out.decree.confidence));
    assert_eq!(out.memory.consecutive_successes, 1);
}

#[test]
fn errors_outrank_a_long_streak() {
    let out = run(&[], &state(3, 10, 50.0), &EvaluatorMemory::default());
    assert_eq!(out.decree.strategy, Strategy::Debug);
    close(out.decree.confidence, 2.0);
    assert_eq!(out.memory.consecutive_successes, 0);
}

#[test]
fn hype_at_low_urgency_hits_the_ceiling() {
    let out = run(&[], &state(0, 8, 90.0), &EvaluatorMemory::default());
    assert_eq!(out.decree.strategy, Strategy::Hype);
    assert_eq!(out.decree.urgency, Urgency::Low);
    close(out.decree.confidence, 3.0);
}

#[test]
fn low_pressure_is_high_urgency() {
    let out = run(&[], &state(0, 0, 20.0), &EvaluatorMemory::default());
    assert_eq!(out.decree.urgency, Urgency::High);
    close(out.decree.confidence, 1.05);
}

#[test]
fn many_errors_flag_structural_uncertainty() {
    let out = run(&[], &state(6, 0, 50.0), &EvaluatorMemory::default());
    assert!(out.decree.structural_uncertainty);
    assert_eq!(
        out.decree.stop_condition,
        StopCondition::StructuralUncertainty
    );
    close(out.decree.confidence, 0.85);
}

#[test]
fn previous_confidence_is_blended_in() {
    let memory = EvaluatorMemory {
        previous_confidence: Some(3.0),
        consecutive_successes: 4,
    };
    let out = run(&[], &SessionRunState::new(), &memory);
    close(out.decree.confidence, 0.85 * 1.5 + 0.15 * 3.0);
    assert_eq!(out.memory.consecutive_successes, 5);
}

#[test]
fn continue_directive_adds_a_bonus() {
    let history = vec![ChatMessage::user("Please CONTINUE with the plan")];
    let out = run(&history, &SessionRunState::new(), &EvaluatorMemory::default());
    close(out.decree.confidence, 1.8);

    let debug = run(&history, &state(3, 0, 50.0), &EvaluatorMemory::default());
    close(debug.decree.confidence, 1.0);
}

#[test]
fn only_the_latest_user_message_counts() {
    let history = vec![
        ChatMessage::user("continue"),
        ChatMessage::assistant("done"),
        ChatMessage::user("stop here"),
    ];
    let out = run(&history, &SessionRunState::new(), &EvaluatorMemory::default());
    close(out.decree.confidence, 1.5);
}

#[test]
fn non_finite_pressure_falls_back() {
    let out = run(&[], &state(0, 0, f64::NAN), &EvaluatorMemory::default());
    close(out.decree.confidence, 1.2);
}

#[test]
fn confidence_stays_clamped() {
    let previous = [None, Some(0.0), Some(1.2), Some(3.0), Some(50.0)];
    for errors in 0..10 {
        for streak in [0, 1, 5, 8, 12, 40] {
            for pressure in [0.0, 15.0, 30.0, 50.0, 80.0, 100.0] {
                for prev in previous {
                    let memory = EvaluatorMemory {
                        previous_confidence: prev,
                        consecutive_successes: 0,
                    };
                    let c = run(&[], &state(errors, streak, pressure), &memory)
                        .decree
                        .confidence;
                    assert!((0.5..=3.0).contains(&c), "{errors}/{streak}/{pressure}: {c}");
                }
            }
        }
    }
}

#[test]
fn identical_inputs_give_identical_decrees() {
    let history = vec![ChatMessage::user("continue")];
    let s = state(2, 3, 42.0);
    let memory = EvaluatorMemory {
        previous_confidence: Some(1.7),
        consecutive_successes: 2,
    };
    assert_eq!(run(&history, &s, &memory), run(&history, &s, &memory));
}

#[test]
fn blocking_hotspots_come_from_session_state() {
    let mut s = SessionRunState::new();
    let failing = |path: &str| ToolOutcome {
        name: "write_file".to_string(),
        status: InvocationStatus::Error,
        target: Some(path.to_string()),
    };
    for _ in 0..3 {
        s.record_turn(&TurnSummary {
            tools: vec![failing("a.rs")],
            shaky: false,
        });
    }
    s.record_turn(&TurnSummary {
        tools: vec![failing("b.rs")],
        shaky: false,
    });
    let out = run(&[], &s, &EvaluatorMemory::default());
    assert_eq!(out.decree.blocking_hotspots, vec!["a.rs".to_string()]);
}

#[test]
fn turn_evaluator_threads_memory() {
    let evaluator = TurnEvaluator::new(EvaluatorConfig::default());
    let s = SessionRunState::new();
    evaluator.evaluate(&[], &s);
    evaluator.evaluate(&[], &s);
    let memory = evaluator.memory();
    assert_eq!(memory.consecutive_successes, 2);
    close(memory.previous_confidence.unwrap_or_default(), 1.5);

    evaluator.restore(EvaluatorMemory::default());
    assert_eq!(evaluator.memory(), EvaluatorMemory::default());
}

#[test]
fn autonomy_policy_needs_a_clean_landing() {
    let policy = AutonomyPolicy::default();
    let good = run(&[], &SessionRunState::new(), &EvaluatorMemory::default()).decree;
    assert!(policy.should_continue(&good, false));
    assert!(!policy.should_continue(&good, true));

    let debug = run(&[], &state(3, 0, 50.0), &EvaluatorMemory::default()).decree;
    assert!(!policy.should_continue(&debug, false));

    let timid = AutonomyPolicy {
        min_confidence: 2.5,
    };
    assert!(!timid.should_continue(&good, false));
}
