//! Query gate in front of the web search provider.
//!
//! A query is validated, the network is probed, and only then is the
//! provider called. The whole sequence runs under a [`RetryPolicy`]; a
//! rejected query or an unreachable network is an ordinary outcome and is
//! never retried, while provider failures are.

mod probe;
mod retry;

pub use probe::{ConnectivityProbe, HttpProbe};
pub use retry::RetryPolicy;

use crate::config::WebSearchSettings;
use crate::error::Result;
use crate::tools::{DuckDuckGo, SearchProvider};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Returned when a query fails validation.
pub const SKIPPED_MESSAGE: &str = "Skipped invalid search query.";

/// Returned when the connectivity probe fails.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error - search unavailable.";

/// Why a query was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than two whitespace-separated terms.
    TooFewTerms,
    /// Contains a `site:` operator.
    SiteOperator,
    /// Mentions the conversation itself rather than a public fact.
    MentionsConversation,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::TooFewTerms => write!(f, "fewer than two terms"),
            Rejection::SiteOperator => write!(f, "contains a site: operator"),
            Rejection::MentionsConversation => write!(f, "mentions the conversation"),
        }
    }
}

/// Check a query against the gate rules. No network activity.
pub fn validate(query: &str) -> std::result::Result<(), Rejection> {
    if query.split_whitespace().count() < 2 {
        return Err(Rejection::TooFewTerms);
    }

    let lowered = query.to_lowercase();
    if lowered.contains("site:") {
        return Err(Rejection::SiteOperator);
    }
    if lowered.contains("conversation") {
        return Err(Rejection::MentionsConversation);
    }

    Ok(())
}

/// Result of passing a query through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Skipped,
    NetworkUnavailable,
    SearchResult(String),
}

impl GateOutcome {
    /// The text handed back to the agent.
    pub fn into_text(self) -> String {
        match self {
            GateOutcome::Skipped => SKIPPED_MESSAGE.to_string(),
            GateOutcome::NetworkUnavailable => NETWORK_ERROR_MESSAGE.to_string(),
            GateOutcome::SearchResult(text) => text,
        }
    }
}

/// Validation, connectivity probe and delegated search under one retry policy.
pub struct QueryGate {
    probe: Arc<dyn ConnectivityProbe>,
    provider: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
}

impl QueryGate {
    /// Create a gate from its parts.
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        provider: Arc<dyn SearchProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            probe,
            provider,
            retry,
        }
    }

    /// Create the DuckDuckGo-backed gate described by the settings.
    pub fn from_settings(settings: &WebSearchSettings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpProbe::from_settings(settings)?),
            Arc::new(DuckDuckGo::with_max_results(settings.max_results)?),
            RetryPolicy::from_settings(&settings.retry),
        ))
    }

    /// Run the gate and report which outcome was reached.
    ///
    /// Provider errors are retried; once the attempts run out the last one
    /// is returned.
    #[instrument(skip(self))]
    pub async fn check(&self, query: &str) -> Result<GateOutcome> {
        self.retry
            .run(move |attempt| self.attempt(query, attempt))
            .await
    }

    /// Run the gate and return the text for the caller.
    pub async fn search(&self, query: &str) -> Result<String> {
        Ok(self.check(query).await?.into_text())
    }

    async fn attempt(&self, query: &str, attempt: u32) -> Result<GateOutcome> {
        if let Err(reason) = validate(query) {
            debug!("Skipping query {:?}: {}", query, reason);
            return Ok(GateOutcome::Skipped);
        }

        if !self.probe.is_reachable().await {
            info!("Connectivity probe failed, not searching");
            return Ok(GateOutcome::NetworkUnavailable);
        }

        debug!("Searching {:?} (attempt {})", query, attempt);
        let text = self.provider.search(query).await?;
        Ok(GateOutcome::SearchResult(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoutError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubProbe {
        reachable: bool,
        calls: AtomicU32,
    }

    impl StubProbe {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                reachable,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ConnectivityProbe for StubProbe {
        async fn is_reachable(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    /// Fails `failures` times, then echoes a fixed answer.
    struct StubProvider {
        failures: u32,
        answer: String,
        queries: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(failures: u32, answer: &str) -> Arc<Self> {
            Arc::new(Self {
                failures,
                answer: answer.to_string(),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn search(&self, query: &str) -> Result<String> {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            if queries.len() as u32 <= self.failures {
                Err(ScoutError::Provider("temporarily unavailable".to_string()))
            } else {
                Ok(self.answer.clone())
            }
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            multiplier: Duration::from_millis(1),
            min_wait: Duration::from_millis(2),
            max_wait: Duration::from_millis(10),
        }
    }

    fn gate(probe: Arc<StubProbe>, provider: Arc<StubProvider>) -> QueryGate {
        QueryGate::new(probe, provider, fast_retry())
    }

    #[test]
    fn test_validate_rules() {
        assert_eq!(validate("rust"), Err(Rejection::TooFewTerms));
        assert_eq!(validate("   "), Err(Rejection::TooFewTerms));
        assert_eq!(validate("  tokio\t "), Err(Rejection::TooFewTerms));
        assert_eq!(
            validate("tokio SITE:docs.rs"),
            Err(Rejection::SiteOperator)
        );
        assert_eq!(
            validate("summarize our Conversation"),
            Err(Rejection::MentionsConversation)
        );
        assert_eq!(validate("rust async runtime"), Ok(()));
    }

    #[tokio::test]
    async fn test_single_token_skipped_without_network() {
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(0, "unused");
        let gate = gate(probe.clone(), provider.clone());

        for query in ["rust", "", "   ", "\tlinux\n"] {
            assert_eq!(gate.search(query).await.unwrap(), SKIPPED_MESSAGE);
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_site_operator_skipped_in_any_case() {
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(0, "unused");
        let gate = gate(probe.clone(), provider.clone());

        for query in [
            "rust site:github.com",
            "rust SITE:github.com",
            "Site: docs tokio",
            "x sItE:y",
        ] {
            assert_eq!(gate.search(query).await.unwrap(), SKIPPED_MESSAGE);
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conversation_skipped_in_any_case() {
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(0, "unused");
        let gate = gate(probe.clone(), provider.clone());

        for query in [
            "previous conversation summary",
            "Conversation history",
            "the CONVERSATIONAL agents",
        ] {
            assert_eq!(
                gate.check(query).await.unwrap(),
                GateOutcome::Skipped,
                "{}",
                query
            );
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_returns_network_error() {
        let probe = StubProbe::new(false);
        let provider = StubProvider::new(0, "unused");
        let gate = gate(probe.clone(), provider.clone());

        let text = gate.search("latest rust release").await.unwrap();
        assert_eq!(text, NETWORK_ERROR_MESSAGE);
        // Not retried
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_passes_result_through_unmodified() {
        let answer = "  Rust 1.80 was released on July 25, 2024.\n  ";
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(0, answer);
        let gate = gate(probe, provider.clone());

        let text = gate.search("Latest Rust Release").await.unwrap();
        assert_eq!(text, answer);
        assert_eq!(
            provider.queries.lock().unwrap().as_slice(),
            ["Latest Rust Release"]
        );
    }

    #[tokio::test]
    async fn test_transient_provider_failure_is_retried() {
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(2, "found it");
        let gate = gate(probe.clone(), provider.clone());

        let text = gate.search("rust borrow checker").await.unwrap();
        assert_eq!(text, "found it");
        assert_eq!(provider.calls(), 3);
        // The probe runs again on every attempt
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_propagates() {
        let probe = StubProbe::new(true);
        let provider = StubProvider::new(u32::MAX, "never");
        let gate = gate(probe, provider.clone());

        let err = gate.search("rust borrow checker").await.unwrap_err();
        assert!(matches!(
            err,
            ScoutError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(provider.calls(), 3);
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(GateOutcome::Skipped.into_text(), SKIPPED_MESSAGE);
        assert_eq!(
            GateOutcome::NetworkUnavailable.into_text(),
            NETWORK_ERROR_MESSAGE
        );
        assert_eq!(
            GateOutcome::SearchResult("abc".to_string()).into_text(),
            "abc"
        );
    }
}
