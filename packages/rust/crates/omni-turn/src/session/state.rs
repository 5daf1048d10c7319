//! Cross-turn session run state consumed by the turn evaluator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::invocation::InvocationStatus;

/// Pressure every session starts from.
pub const INITIAL_PRESSURE: f64 = 50.0;
const PRESSURE_MIN: f64 = 0.0;
const PRESSURE_MAX: f64 = 100.0;
const PRESSURE_SUCCESS_STEP: f64 = 5.0;
const PRESSURE_ERROR_STEP: f64 = 10.0;

/// Per-file error tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub count: u32,
    /// `error_seq` value at the most recent error on this file.
    pub last_seen: u64,
}

/// Outcome of one dispatched tool, as summarized for session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub name: String,
    pub status: InvocationStatus,
    /// File the tool targeted, when it names one.
    pub target: Option<String>,
}

/// Everything `record_turn` needs from a finished turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    pub tools: Vec<ToolOutcome>,
    pub shaky: bool,
}

impl TurnSummary {
    pub fn error_count(&self) -> usize {
        self.tools
            .iter()
            .filter(|t| t.status == InvocationStatus::Error)
            .count()
    }
}

/// Mutable cross-turn state, owned by the caller.
///
/// Only [`record_turn`](Self::record_turn) mutates it, once per finished turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRunState {
    pub total_errors: u32,
    pub victory_streak: u32,
    pub pressure: f64,
    pub tool_history_len: usize,
    pub turns: u64,
    pub hotspots: BTreeMap<String, Hotspot>,
    error_seq: u64,
}

impl Default for SessionRunState {
    fn default() -> Self {
        Self {
            total_errors: 0,
            victory_streak: 0,
            pressure: INITIAL_PRESSURE,
            tool_history_len: 0,
            turns: 0,
            hotspots: BTreeMap::new(),
            error_seq: 0,
        }
    }
}

impl SessionRunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished turn into the state.
    ///
    /// Pressure rises by 5 per successful tool and falls by 10 per failed
    /// one, clamped to `[0, 100]`. The streak grows on a clean, non-shaky
    /// turn and resets otherwise.
    pub fn record_turn(&mut self, summary: &TurnSummary) {
        self.turns += 1;
        self.tool_history_len += summary.tools.len();

        let mut errors = 0u32;
        for tool in &summary.tools {
            match tool.status {
                InvocationStatus::Error => {
                    errors += 1;
                    self.error_seq += 1;
                    self.pressure -= PRESSURE_ERROR_STEP;
                    if let Some(target) = &tool.target {
                        let seq = self.error_seq;
                        let spot = self.hotspots.entry(target.clone()).or_insert(Hotspot {
                            count: 0,
                            last_seen: seq,
                        });
                        spot.count += 1;
                        spot.last_seen = seq;
                    }
                }
                InvocationStatus::Completed => self.pressure += PRESSURE_SUCCESS_STEP,
                InvocationStatus::Pending | InvocationStatus::Running => {}
            }
        }
        self.pressure = if self.pressure.is_finite() {
            self.pressure.clamp(PRESSURE_MIN, PRESSURE_MAX)
        } else {
            INITIAL_PRESSURE
        };
        self.total_errors += errors;

        if errors == 0 && !summary.shaky {
            self.victory_streak += 1;
        } else {
            self.victory_streak = 0;
        }
    }

    /// Files with at least `threshold` errors, most recently seen first,
    /// capped at `limit`.
    pub fn blocking_hotspots(&self, threshold: u32, limit: usize) -> Vec<String> {
        let mut blocking: Vec<(&String, &Hotspot)> = self
            .hotspots
            .iter()
            .filter(|(_, spot)| spot.count >= threshold)
            .collect();
        blocking.sort_by(|a, b| b.1.last_seen.cmp(&a.1.last_seen).then_with(|| a.0.cmp(b.0)));
        blocking
            .into_iter()
            .take(limit)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session_state.rs"]
mod tests;
