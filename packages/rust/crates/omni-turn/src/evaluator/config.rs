//! Evaluator tunables. Every threshold is configurable; defaults are the
//! empirically tuned values.

use serde::{Deserialize, Serialize};

/// Confidence profile applied after smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Standard,
    Demonstration,
    Recovery,
}

impl Profile {
    pub const fn factor(self) -> f64 {
        match self {
            Self::Standard => 1.0,
            Self::Demonstration => 1.2,
            Self::Recovery => 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Total errors at which the strategy becomes DEBUG.
    #[serde(default = "default_debug_error_threshold")]
    pub debug_error_threshold: u32,
    /// Victory streak at which the strategy becomes HYPE.
    #[serde(default = "default_hype_streak_threshold")]
    pub hype_streak_threshold: u32,
    /// Pressure below this is HIGH urgency.
    #[serde(default = "default_high_urgency_pressure")]
    pub high_urgency_pressure: f64,
    /// Pressure above this is LOW urgency.
    #[serde(default = "default_low_urgency_pressure")]
    pub low_urgency_pressure: f64,
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,
    #[serde(default = "default_hype_confidence")]
    pub hype_confidence: f64,
    #[serde(default = "default_debug_confidence")]
    pub debug_confidence: f64,
    #[serde(default = "default_high_urgency_factor")]
    pub high_urgency_factor: f64,
    #[serde(default = "default_low_urgency_factor")]
    pub low_urgency_factor: f64,
    /// Bonus per streak step, applied twice.
    #[serde(default = "default_streak_bonus_step")]
    pub streak_bonus_step: f64,
    #[serde(default = "default_streak_bonus_cap")]
    pub streak_bonus_cap: f64,
    #[serde(default = "default_pressure_weight")]
    pub pressure_weight: f64,
    #[serde(default = "default_pressure_midpoint")]
    pub pressure_midpoint: f64,
    /// Weight of the current computation against the previous confidence.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Total errors above this flag structural uncertainty.
    #[serde(default = "default_structural_error_threshold")]
    pub structural_error_threshold: u32,
    #[serde(default = "default_structural_penalty")]
    pub structural_penalty: f64,
    #[serde(default = "default_continue_bonus")]
    pub continue_bonus: f64,
    /// Per-file errors at which a file blocks.
    #[serde(default = "default_hotspot_threshold")]
    pub hotspot_threshold: u32,
    #[serde(default = "default_hotspot_limit")]
    pub hotspot_limit: usize,
    #[serde(default = "default_aggression")]
    pub aggression: f64,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f64,
    /// Used when the computation goes non-finite.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            debug_error_threshold: default_debug_error_threshold(),
            hype_streak_threshold: default_hype_streak_threshold(),
            high_urgency_pressure: default_high_urgency_pressure(),
            low_urgency_pressure: default_low_urgency_pressure(),
            base_confidence: default_base_confidence(),
            hype_confidence: default_hype_confidence(),
            debug_confidence: default_debug_confidence(),
            high_urgency_factor: default_high_urgency_factor(),
            low_urgency_factor: default_low_urgency_factor(),
            streak_bonus_step: default_streak_bonus_step(),
            streak_bonus_cap: default_streak_bonus_cap(),
            pressure_weight: default_pressure_weight(),
            pressure_midpoint: default_pressure_midpoint(),
            smoothing: default_smoothing(),
            structural_error_threshold: default_structural_error_threshold(),
            structural_penalty: default_structural_penalty(),
            continue_bonus: default_continue_bonus(),
            hotspot_threshold: default_hotspot_threshold(),
            hotspot_limit: default_hotspot_limit(),
            aggression: default_aggression(),
            profile: Profile::default(),
            min_confidence: default_min_confidence(),
            max_confidence: default_max_confidence(),
            fallback_confidence: default_fallback_confidence(),
        }
    }
}

fn default_debug_error_threshold() -> u32 {
    3
}
fn default_hype_streak_threshold() -> u32 {
    8
}
fn default_high_urgency_pressure() -> f64 {
    30.0
}
fn default_low_urgency_pressure() -> f64 {
    80.0
}
fn default_base_confidence() -> f64 {
    1.5
}
fn default_hype_confidence() -> f64 {
    2.2
}
fn default_debug_confidence() -> f64 {
    1.0
}
fn default_high_urgency_factor() -> f64 {
    0.8
}
fn default_low_urgency_factor() -> f64 {
    1.1
}
fn default_streak_bonus_step() -> f64 {
    0.05
}
fn default_streak_bonus_cap() -> f64 {
    0.5
}
fn default_pressure_weight() -> f64 {
    0.005
}
fn default_pressure_midpoint() -> f64 {
    50.0
}
fn default_smoothing() -> f64 {
    0.85
}
fn default_structural_error_threshold() -> u32 {
    5
}
fn default_structural_penalty() -> f64 {
    0.85
}
fn default_continue_bonus() -> f64 {
    0.3
}
fn default_hotspot_threshold() -> u32 {
    3
}
fn default_hotspot_limit() -> usize {
    4
}
fn default_aggression() -> f64 {
    1.0
}
fn default_min_confidence() -> f64 {
    0.5
}
fn default_max_confidence() -> f64 {
    3.0
}
fn default_fallback_confidence() -> f64 {
    1.2
}
