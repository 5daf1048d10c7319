//! Effective engine configuration.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::evaluator::{AutonomyPolicy, EvaluatorConfig};
use crate::liveness::LivenessConfig;
use crate::tools::ApprovalMode;

/// Which model backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Key into the provider table (`openai`, `litellm`, `deepseek`).
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    /// Overrides the provider's default chat-completions URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_url: Option<String>,
    /// Overrides the provider's default API key variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            inference_url: None,
            api_key_env: None,
        }
    }
}

/// Liveness bounds in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessBounds {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
}

impl Default for LivenessBounds {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            watchdog_secs: default_watchdog_secs(),
        }
    }
}

impl LivenessBounds {
    pub fn to_config(self) -> LivenessConfig {
        LivenessConfig {
            heartbeat: Duration::from_secs(self.heartbeat_secs),
            watchdog: Duration::from_secs(self.watchdog_secs),
        }
    }
}

/// Everything a `TurnEngine` and the CLI loop need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Ratio used by token estimation.
    #[serde(default = "default_tokens_per_char")]
    pub tokens_per_char: f64,
    #[serde(default)]
    pub liveness: LivenessBounds,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub approval_mode: ApprovalMode,
    /// Clear backups after a successful turn. When false the operator must
    /// accept or revert each turn.
    #[serde(default = "default_auto_accept")]
    pub auto_accept: bool,
    #[serde(default)]
    pub autonomy: AutonomyPolicy,
    /// Upper bound on turns per CLI request.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: None,
            max_tokens: default_max_tokens(),
            provider: ProviderConfig::default(),
            tokens_per_char: default_tokens_per_char(),
            liveness: LivenessBounds::default(),
            evaluator: EvaluatorConfig::default(),
            approval_mode: ApprovalMode::default(),
            auto_accept: default_auto_accept(),
            autonomy: AutonomyPolicy::default(),
            max_turns: default_max_turns(),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be positive"));
        }
        if !(self.tokens_per_char.is_finite() && self.tokens_per_char > 0.0) {
            return Err(invalid("tokens_per_char", "must be a positive number"));
        }
        if self.liveness.heartbeat_secs == 0 {
            return Err(invalid("liveness.heartbeat_secs", "must be positive"));
        }
        if self.liveness.watchdog_secs == 0 {
            return Err(invalid("liveness.watchdog_secs", "must be positive"));
        }
        let evaluator = &self.evaluator;
        if !matches!(
            evaluator.min_confidence.partial_cmp(&evaluator.max_confidence),
            Some(Ordering::Less | Ordering::Equal)
        ) {
            return Err(invalid(
                "evaluator.min_confidence",
                "must not exceed evaluator.max_confidence",
            ));
        }
        if !(0.0..=1.0).contains(&evaluator.smoothing) {
            return Err(invalid("evaluator.smoothing", "must be within [0, 1]"));
        }
        if self.max_turns == 0 {
            return Err(invalid("max_turns", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_provider_id() -> String {
    "openai".to_string()
}
fn default_heartbeat_secs() -> u64 {
    60
}
fn default_watchdog_secs() -> u64 {
    120
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_tokens_per_char() -> f64 {
    0.25
}
fn default_auto_accept() -> bool {
    true
}
fn default_max_turns() -> u32 {
    1
}
