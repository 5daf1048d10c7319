//! Settings loader for omni-turn.
//!
//! Loads and merges:
//! - System defaults: `<project root>/packages/conf/settings.yaml`
//! - User overrides:  `<config home>/omni-turn/settings.yaml`
//!
//! Merge precedence is environment over user over system. Missing or
//! malformed files are logged and ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{EngineConfig, LivenessBounds, ProviderConfig};
use crate::error::ConfigError;
use crate::evaluator::{AutonomyPolicy, EvaluatorConfig};
use crate::observability::SessionEvent;
use crate::tools::ApprovalMode;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-turn/settings.yaml";

/// YAML shape of a settings file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnSettings {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub liveness: LivenessSettings,
    /// Partial `EvaluatorConfig`; merged key by key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<serde_yaml::Mapping>,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub id: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub tokens_per_char: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub id: Option<String>,
    pub inference_url: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessSettings {
    pub heartbeat_secs: Option<u64>,
    pub watchdog_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub approval_mode: Option<ApprovalMode>,
    pub auto_accept: Option<bool>,
    pub max_turns: Option<u32>,
    pub min_confidence: Option<f64>,
}

impl TurnSettings {
    /// Field-by-field merge; `overlay` wins.
    #[must_use]
    pub fn merge(self, overlay: Self) -> Self {
        Self {
            model: self.model.merge(overlay.model),
            provider: self.provider.merge(overlay.provider),
            liveness: self.liveness.merge(overlay.liveness),
            evaluator: merge_mapping(self.evaluator, overlay.evaluator),
            session: self.session.merge(overlay.session),
        }
    }

    /// Apply `OMNI_TURN_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are logged and skipped.
    #[must_use]
    pub fn apply_env(mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(model) = read("OMNI_TURN_MODEL") {
            self.model.id = Some(model);
        }
        if let Some(provider) = read("OMNI_TURN_PROVIDER") {
            self.provider.id = Some(provider);
        }
        if let Some(url) = read("OMNI_TURN_INFERENCE_URL") {
            self.provider.inference_url = Some(url);
        }
        let secs = |key: &str| read(key).and_then(|raw| parse_secs(key, &raw));
        if let Some(value) = secs("OMNI_TURN_HEARTBEAT_SECS") {
            self.liveness.heartbeat_secs = Some(value);
        }
        if let Some(value) = secs("OMNI_TURN_WATCHDOG_SECS") {
            self.liveness.watchdog_secs = Some(value);
        }
        self
    }

    /// Resolve against defaults and validate.
    ///
    /// # Errors
    /// `ConfigError::Invalid` for a malformed evaluator block or any value
    /// rejected by [`EngineConfig::validate`].
    pub fn into_engine_config(self) -> Result<EngineConfig, ConfigError> {
        let defaults = EngineConfig::default();
        let evaluator = match self.evaluator {
            Some(mapping) => {
                serde_yaml::from_value::<EvaluatorConfig>(serde_yaml::Value::Mapping(mapping))
                    .map_err(|error| ConfigError::Invalid {
                        field: "evaluator".to_string(),
                        reason: error.to_string(),
                    })?
            }
            None => defaults.evaluator,
        };
        let config = EngineConfig {
            model: self.model.id.unwrap_or(defaults.model),
            system_prompt: self.model.system_prompt.or(defaults.system_prompt),
            max_tokens: self.model.max_tokens.unwrap_or(defaults.max_tokens),
            provider: ProviderConfig {
                provider_id: self.provider.id.unwrap_or(defaults.provider.provider_id),
                inference_url: self.provider.inference_url,
                api_key_env: self.provider.api_key_env,
            },
            tokens_per_char: self.model.tokens_per_char.unwrap_or(defaults.tokens_per_char),
            liveness: LivenessBounds {
                heartbeat_secs: self
                    .liveness
                    .heartbeat_secs
                    .unwrap_or(defaults.liveness.heartbeat_secs),
                watchdog_secs: self
                    .liveness
                    .watchdog_secs
                    .unwrap_or(defaults.liveness.watchdog_secs),
            },
            evaluator,
            approval_mode: self.session.approval_mode.unwrap_or(defaults.approval_mode),
            auto_accept: self.session.auto_accept.unwrap_or(defaults.auto_accept),
            autonomy: AutonomyPolicy {
                min_confidence: self
                    .session
                    .min_confidence
                    .unwrap_or(defaults.autonomy.min_confidence),
            },
            max_turns: self.session.max_turns.unwrap_or(defaults.max_turns),
        };
        config.validate()?;
        Ok(config)
    }
}

impl ModelSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            id: overlay.id.or(self.id),
            system_prompt: overlay.system_prompt.or(self.system_prompt),
            max_tokens: overlay.max_tokens.or(self.max_tokens),
            tokens_per_char: overlay.tokens_per_char.or(self.tokens_per_char),
        }
    }
}

impl ProviderSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            id: overlay.id.or(self.id),
            inference_url: overlay.inference_url.or(self.inference_url),
            api_key_env: overlay.api_key_env.or(self.api_key_env),
        }
    }
}

impl LivenessSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            heartbeat_secs: overlay.heartbeat_secs.or(self.heartbeat_secs),
            watchdog_secs: overlay.watchdog_secs.or(self.watchdog_secs),
        }
    }
}

impl SessionSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            approval_mode: overlay.approval_mode.or(self.approval_mode),
            auto_accept: overlay.auto_accept.or(self.auto_accept),
            max_turns: overlay.max_turns.or(self.max_turns),
            min_confidence: overlay.min_confidence.or(self.min_confidence),
        }
    }
}

fn merge_mapping(
    base: Option<serde_yaml::Mapping>,
    overlay: Option<serde_yaml::Mapping>,
) -> Option<serde_yaml::Mapping> {
    match (base, overlay) {
        (None, None) => None,
        (Some(mapping), None) | (None, Some(mapping)) => Some(mapping),
        (Some(mut mapping), Some(overlay)) => {
            for (key, value) in overlay {
                mapping.insert(key, value);
            }
            Some(mapping)
        }
    }
}

fn parse_secs(key: &str, raw: &str) -> Option<u64> {
    match raw.parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(error) => {
            tracing::warn!(
                key,
                value = raw,
                error = %error,
                "invalid environment override; ignoring"
            );
            None
        }
    }
}

/// System and user settings paths.
///
/// `config_home` defaults to `<project_root>/.config`; a relative value is
/// resolved against `project_root`.
pub fn settings_paths(project_root: &Path, config_home: Option<&Path>) -> (PathBuf, PathBuf) {
    let system_path = project_root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let home = match config_home {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => project_root.join(path),
        None => project_root.join(".config"),
    };
    (system_path, home.join(DEFAULT_USER_SETTINGS_RELATIVE_PATH))
}

/// Load both files and merge user over system.
pub fn load_turn_settings_from_paths(system: &Path, user: &Path) -> TurnSettings {
    let settings = load_one(system).merge(load_one(user));
    tracing::debug!(
        event = SessionEvent::SettingsLoaded.as_str(),
        system = %system.display(),
        user = %user.display(),
        "settings loaded"
    );
    settings
}

fn load_one(path: &Path) -> TurnSettings {
    if !path.exists() {
        return TurnSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return TurnSettings::default();
        }
    };
    if raw.trim().is_empty() {
        return TurnSettings::default();
    }
    match serde_yaml::from_str::<TurnSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            TurnSettings::default()
        }
    }
}
