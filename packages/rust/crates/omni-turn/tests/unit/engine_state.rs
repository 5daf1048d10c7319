use super::*;

#[test]
fn state_names_match_progress_stages() {
    let names: Vec<&str> = [
        TurnState::Idle,
        TurnState::Streaming,
        TurnState::AssemblingTools,
        TurnState::DispatchingTools,
        TurnState::Evaluating,
        TurnState::RolledBack,
        TurnState::Recovered,
    ]
    .into_iter()
    .map(TurnState::as_str)
    .collect();
    assert_eq!(
        names,
        [
            "idle",
            "streaming",
            "assembling_tools",
            "dispatching_tools",
            "evaluating",
            "rolled_back",
            "recovered"
        ]
    );
}
