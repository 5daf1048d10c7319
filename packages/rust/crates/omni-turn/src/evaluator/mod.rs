//! Deterministic turn evaluation.
//!
//! Replaces a "how did that go?" model call with a pure function of session
//! state. The decree's strategy, urgency, confidence and stop condition drive
//! autonomous continuation; the rationale is cosmetic.

mod config;
mod policy;
mod rationale;

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::observability::SessionEvent;
use crate::session::{ChatMessage, SessionRunState};

pub use config::{EvaluatorConfig, Profile};
pub use policy::AutonomyPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Execute,
    Debug,
    Hype,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "EXECUTE",
            Self::Debug => "DEBUG",
            Self::Hype => "HYPE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    Landed,
    StructuralUncertainty,
}

impl StopCondition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landed => "landed",
            Self::StructuralUncertainty => "structural_uncertainty",
        }
    }
}

/// Evaluator output for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDecree {
    pub strategy: Strategy,
    pub urgency: Urgency,
    /// Always within the configured clamp (default `[0.5, 3.0]`).
    pub confidence: f64,
    pub stop_condition: StopCondition,
    pub rationale: String,
    pub blocking_hotspots: Vec<String>,
    pub structural_uncertainty: bool,
}

/// What the evaluator carries from one turn to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorMemory {
    pub previous_confidence: Option<f64>,
    pub consecutive_successes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decree: TurnDecree,
    pub memory: EvaluatorMemory,
}

/// Derive a decree from session state. Pure: identical inputs give an
/// identical evaluation.
pub fn evaluate(
    history: &[ChatMessage],
    state: &SessionRunState,
    config: &EvaluatorConfig,
    memory: &EvaluatorMemory,
) -> Evaluation {
    let strategy = if state.total_errors >= config.debug_error_threshold {
        Strategy::Debug
    } else if state.victory_streak >= config.hype_streak_threshold {
        Strategy::Hype
    } else {
        Strategy::Execute
    };

    let urgency = if state.pressure < config.high_urgency_pressure {
        Urgency::High
    } else if state.pressure > config.low_urgency_pressure {
        Urgency::Low
    } else {
        Urgency::Medium
    };

    let streak_bonus =
        (f64::from(state.victory_streak) * config.streak_bonus_step).min(config.streak_bonus_cap);

    let mut confidence = match strategy {
        Strategy::Execute => config.base_confidence,
        Strategy::Hype => config.hype_confidence,
        Strategy::Debug => config.debug_confidence,
    };
    confidence *= match urgency {
        Urgency::High => config.high_urgency_factor,
        Urgency::Low => config.low_urgency_factor,
        Urgency::Medium => 1.0,
    };
    confidence += streak_bonus;
    confidence += (state.pressure - config.pressure_midpoint) * config.pressure_weight;
    if let Some(previous) = memory.previous_confidence {
        confidence = config.smoothing * confidence + (1.0 - config.smoothing) * previous;
    }

    confidence *= config.profile.factor() * config.aggression;
    confidence += streak_bonus;
    let structural_uncertainty = state.total_errors > config.structural_error_threshold;
    if structural_uncertainty {
        confidence *= config.structural_penalty;
    }
    confidence = clamp_confidence(confidence, config);

    if strategy != Strategy::Debug && asks_to_continue(history) {
        confidence = clamp_confidence(confidence + config.continue_bonus, config);
    }

    let stop_condition = if structural_uncertainty {
        StopCondition::StructuralUncertainty
    } else {
        StopCondition::Landed
    };

    let consecutive_successes = if strategy == Strategy::Debug {
        0
    } else {
        memory.consecutive_successes.saturating_add(1)
    };

    Evaluation {
        decree: TurnDecree {
            strategy,
            urgency,
            confidence,
            stop_condition,
            rationale: rationale::select(
                state.victory_streak,
                state.total_errors,
                state.pressure,
                state.tool_history_len,
            )
            .to_string(),
            blocking_hotspots: state
                .blocking_hotspots(config.hotspot_threshold, config.hotspot_limit),
            structural_uncertainty,
        },
        memory: EvaluatorMemory {
            previous_confidence: Some(confidence),
            consecutive_successes,
        },
    }
}

fn clamp_confidence(value: f64, config: &EvaluatorConfig) -> f64 {
    let value = if value.is_finite() {
        value
    } else {
        config.fallback_confidence
    };
    value.clamp(config.min_confidence, config.max_confidence)
}

fn asks_to_continue(history: &[ChatMessage]) -> bool {
    history
        .iter()
        .rev()
        .find(|message| message.is_user())
        .is_some_and(|message| message.text().to_lowercase().contains("continue"))
}

/// Stateful wrapper that threads [`EvaluatorMemory`] between turns.
#[derive(Debug, Default)]
pub struct TurnEvaluator {
    config: EvaluatorConfig,
    memory: Mutex<EvaluatorMemory>,
}

impl TurnEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            memory: Mutex::new(EvaluatorMemory::default()),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn memory(&self) -> EvaluatorMemory {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn restore(&self, memory: EvaluatorMemory) {
        *self.memory.lock().unwrap_or_else(PoisonError::into_inner) = memory;
    }

    /// Evaluate and remember the result for the next turn's smoothing.
    pub fn evaluate(&self, history: &[ChatMessage], state: &SessionRunState) -> TurnDecree {
        let mut memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        let evaluation = evaluate(history, state, &self.config, &memory);
        *memory = evaluation.memory;
        let decree = evaluation.decree;
        tracing::info!(
            event = SessionEvent::EvaluatorDecree.as_str(),
            strategy = decree.strategy.as_str(),
            urgency = decree.urgency.as_str(),
            confidence = decree.confidence,
            stop_condition = decree.stop_condition.as_str(),
            blocking_hotspots = decree.blocking_hotspots.len(),
            "turn evaluated"
        );
        decree
    }
}

#[cfg(test)]
#[path = "../../tests/unit/evaluator.rs"]
mod tests;
