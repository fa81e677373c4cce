//! Network reachability probe.

use crate::config::WebSearchSettings;
use crate::error::Result;
use crate::tools::http_client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Checks whether the network is usable before a search is attempted.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns false on any network failure (timeout, DNS, refused connection).
    async fn is_reachable(&self) -> bool;
}

/// Probe that issues a GET to a known-reachable URL.
///
/// Any HTTP response counts as reachable, whatever its status code.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe for `url` with the given timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.to_string(),
            timeout,
        })
    }

    /// Create a probe from web search settings.
    pub fn from_settings(settings: &WebSearchSettings) -> Result<Self> {
        Self::new(
            &settings.probe_url,
            Duration::from_secs_f64(settings.probe_timeout_secs),
        )
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!("Probe {} answered {}", self.url, response.status());
                true
            }
            Err(e) => {
                debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reachable_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_error_status_still_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(&server.uri(), Duration::from_millis(100)).unwrap();
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new(&format!("http://{}", addr), Duration::from_secs(1)).unwrap();
        assert!(!probe.is_reachable().await);
    }
}
