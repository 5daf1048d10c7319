use serde::{Deserialize, Serialize};

use super::{StopCondition, Strategy, TurnDecree};

/// Decides whether the caller should run another turn without the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutonomyPolicy {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    1.0
}

impl Default for AutonomyPolicy {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

impl AutonomyPolicy {
    pub fn should_continue(&self, decree: &TurnDecree, shaky: bool) -> bool {
        !shaky
            && decree.strategy != Strategy::Debug
            && decree.stop_condition == StopCondition::Landed
            && decree.confidence >= self.min_confidence
    }
}
