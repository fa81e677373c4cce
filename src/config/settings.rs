//! Configuration settings for Scout.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub chat: ChatSettings,
    pub tools: ToolSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error), used when no -v flag is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Chat completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model used by the agent.
    pub model: String,
    /// Sampling temperature for the agent.
    pub temperature: f32,
    /// API key. Takes precedence over the environment variable.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// HTTP timeout for completion requests.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.1,
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    /// Resolve the API key from the config file, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of model calls per turn.
    pub max_iterations: usize,
    /// Wall-clock budget for one agent run.
    pub max_execution_secs: u64,
    /// Model used for direct completions when the agent gives up.
    pub fallback_model: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_execution_secs: 60,
            fallback_model: "llama-3.1-8b-instant".to_string(),
        }
    }
}

impl AgentSettings {
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_secs(self.max_execution_secs)
    }
}

/// Chat session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// First assistant message of every session.
    pub greeting: String,
    /// Prepend earlier turns to the question sent to the agent.
    pub inject_history: bool,
    /// Sessions unused for this long are dropped by the server.
    pub session_ttl_secs: u64,
    /// Upper bound on sessions the server keeps; the least recently used goes first.
    pub max_sessions: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            greeting: "Hi! Ask me anything technical! 🚀".to_string(),
            inject_history: true,
            session_ttl_secs: 3600,
            max_sessions: 1000,
        }
    }
}

impl ChatSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Lookup tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ToolSettings {
    pub wikipedia: WikipediaSettings,
    pub arxiv: ArxivSettings,
    pub web_search: WebSearchSettings,
}

/// Wikipedia summary tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaSettings {
    /// Wikipedia language edition.
    pub lang: String,
    /// Number of pages to summarize.
    pub top_k_results: usize,
    /// Maximum characters returned to the model.
    pub doc_content_chars_max: usize,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            top_k_results: 1,
            doc_content_chars_max: 200,
        }
    }
}

/// arXiv abstract search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivSettings {
    /// Number of papers to return.
    pub top_k_results: usize,
    /// Maximum characters returned to the model.
    pub doc_content_chars_max: usize,
}

impl Default for ArxivSettings {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 2300,
        }
    }
}

/// Guarded web search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    /// URL fetched to check that the network is up before searching.
    pub probe_url: String,
    /// Timeout for the connectivity probe.
    pub probe_timeout_secs: f64,
    /// Number of result snippets joined into the answer.
    pub max_results: usize,
    /// Retry policy wrapped around the whole search.
    pub retry: RetrySettings,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            probe_url: "https://duckduckgo.com/?q=test".to_string(),
            probe_timeout_secs: 5.0,
            max_results: 5,
            retry: RetrySettings::default(),
        }
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base of the exponential wait.
    pub multiplier_secs: f64,
    /// Lower bound for a single wait.
    pub min_wait_secs: f64,
    /// Upper bound for a single wait.
    pub max_wait_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_secs: 1.0,
            min_wait_secs: 2.0,
            max_wait_secs: 10.0,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scout")
            .join("config.toml")
    }

    /// Reject values that would make the runtime misbehave.
    pub fn validate(&self) -> Result<()> {
        let retry = &self.tools.web_search.retry;
        if retry.max_attempts == 0 {
            return Err(ScoutError::Config(
                "tools.web_search.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("multiplier_secs", retry.multiplier_secs),
            ("min_wait_secs", retry.min_wait_secs),
            ("max_wait_secs", retry.max_wait_secs),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ScoutError::Config(format!(
                    "tools.web_search.retry.{} must be a non-negative number of seconds within range",
                    key
                )));
            }
        }
        if retry.min_wait_secs > retry.max_wait_secs {
            return Err(ScoutError::Config(
                "tools.web_search.retry.min_wait_secs exceeds max_wait_secs".to_string(),
            ));
        }

        let probe = self.tools.web_search.probe_timeout_secs;
        if probe <= 0.0 || Duration::try_from_secs_f64(probe).is_err() {
            return Err(ScoutError::Config(
                "tools.web_search.probe_timeout_secs must be a positive number of seconds within range"
                    .to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ScoutError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.chat.max_sessions == 0 {
            return Err(ScoutError::Config(
                "chat.max_sessions must be at least 1".to_string(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ScoutError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
