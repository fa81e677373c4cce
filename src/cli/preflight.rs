//! Pre-flight checks before talking to the LLM.
//!
//! Fails early with a helpful message instead of letting the first
//! request bounce off the API.

use crate::config::Settings;
use crate::error::{Result, ScoutError};

/// Return the configured API key or explain how to set one.
pub fn require_api_key(settings: &Settings) -> Result<String> {
    settings
        .llm
        .resolve_api_key()
        .ok_or_else(|| ScoutError::MissingApiKey(settings.llm.api_key_env.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_names_variable() {
        let mut settings = Settings::default();
        settings.llm.api_key = None;
        settings.llm.api_key_env = "SCOUT_TEST_NO_SUCH_KEY".to_string();

        let err = require_api_key(&settings).unwrap_err();
        assert!(err.to_string().contains("SCOUT_TEST_NO_SUCH_KEY"));
    }

    #[test]
    fn test_configured_key_returned() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("gsk_configured".to_string());
        assert_eq!(require_api_key(&settings).unwrap(), "gsk_configured");
    }
}
