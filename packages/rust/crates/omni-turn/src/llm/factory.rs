//! Provider lookup table.

use std::sync::Arc;

use super::{ModelStream, OpenAiCompatibleClient};
use crate::config::ProviderConfig;
use crate::error::ConfigError;

/// Resolved parameters handed to a provider constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderParams {
    pub provider_id: String,
    pub inference_url: String,
    pub api_key: Option<String>,
    pub tokens_per_char: f64,
}

/// One row of the provider table.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEntry {
    pub id: &'static str,
    pub default_inference_url: &'static str,
    pub default_api_key_env: &'static str,
    pub build: fn(ProviderParams) -> Arc<dyn ModelStream>,
}

fn openai_compatible(params: ProviderParams) -> Arc<dyn ModelStream> {
    Arc::new(OpenAiCompatibleClient::new(
        params.provider_id,
        params.inference_url,
        params.api_key,
        params.tokens_per_char,
    ))
}

/// Known providers.
pub const PROVIDERS: &[ProviderEntry] = &[
    ProviderEntry {
        id: "openai",
        default_inference_url: "https://api.openai.com/v1/chat/completions",
        default_api_key_env: "OPENAI_API_KEY",
        build: openai_compatible,
    },
    ProviderEntry {
        id: "litellm",
        default_inference_url: "http://127.0.0.1:4000/v1/chat/completions",
        default_api_key_env: "LITELLM_API_KEY",
        build: openai_compatible,
    },
    ProviderEntry {
        id: "deepseek",
        default_inference_url: "https://api.deepseek.com/chat/completions",
        default_api_key_env: "DEEPSEEK_API_KEY",
        build: openai_compatible,
    },
];

/// Build the backend named by `config.provider_id`.
///
/// `env` resolves the API key variable; a missing key is allowed (local
/// proxies often need none).
///
/// # Errors
/// `ConfigError::UnknownProvider` when the id is not in [`PROVIDERS`].
pub fn provider_factory(
    config: &ProviderConfig,
    tokens_per_char: f64,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ModelStream>, ConfigError> {
    let wanted = config.provider_id.trim().to_ascii_lowercase();
    let Some(entry) = PROVIDERS.iter().find(|entry| entry.id == wanted) else {
        let known = PROVIDERS
            .iter()
            .map(|entry| entry.id)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ConfigError::UnknownProvider(config.provider_id.clone(), known));
    };
    let key_env = config
        .api_key_env
        .as_deref()
        .unwrap_or(entry.default_api_key_env);
    let params = ProviderParams {
        provider_id: entry.id.to_string(),
        inference_url: config
            .inference_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| entry.default_inference_url.to_string()),
        api_key: env(key_env).filter(|key| !key.trim().is_empty()),
        tokens_per_char,
    };
    tracing::debug!(
        provider = entry.id,
        inference_url = %params.inference_url,
        api_key_env = key_env,
        has_api_key = params.api_key.is_some(),
        "model provider selected"
    );
    Ok((entry.build)(params))
}
