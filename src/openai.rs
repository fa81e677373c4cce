//! Chat completion client for OpenAI-compatible endpoints (Groq by default).

use crate::config::LlmSettings;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Concrete client type used across the crate.
pub type LlmClient = Client<OpenAIConfig>;

/// Create a client for the configured endpoint with the given API key.
pub fn create_client(settings: &LlmSettings, api_key: &str) -> Result<LlmClient> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(settings.base_url.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
