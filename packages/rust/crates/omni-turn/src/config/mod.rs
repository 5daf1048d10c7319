//! Engine configuration and the YAML settings loader.

mod engine;
mod settings;

pub use engine::{EngineConfig, LivenessBounds, ProviderConfig};
pub use settings::{
    LivenessSettings, ModelSettings, ProviderSettings, SessionSettings, TurnSettings,
    load_turn_settings_from_paths, settings_paths,
};
