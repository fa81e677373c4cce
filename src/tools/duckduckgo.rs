//! DuckDuckGo web search over the HTML endpoint.

use super::{http_client, SearchProvider, PROVIDER_TIMEOUT};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

/// DuckDuckGo web search returning joined result snippets.
pub struct DuckDuckGo {
    client: reqwest::Client,
    html_url: String,
    max_results: usize,
}

impl DuckDuckGo {
    pub fn with_max_results(max_results: usize) -> Result<Self> {
        Ok(Self {
            client: http_client(PROVIDER_TIMEOUT)?,
            html_url: "https://html.duckduckgo.com/html/".to_string(),
            max_results: max_results.max(1),
        })
    }

    /// Point the provider at a different HTML endpoint.
    pub fn with_html_url(mut self, html_url: &str) -> Self {
        self.html_url = html_url.to_string();
        self
    }

    /// Snippets of organic results, ads and DuckDuckGo-internal links skipped.
    fn parse_snippets(html: &str, max_results: usize) -> Vec<String> {
        let document = Html::parse_document(html);

        let result_selector = Selector::parse("div.result").expect("valid selector");
        let link_selector = Selector::parse("a.result__a").expect("valid selector");
        let snippet_selector = Selector::parse(".result__snippet").expect("valid selector");

        let mut snippets = Vec::new();

        for element in document.select(&result_selector) {
            if element.value().classes().any(|c| c == "result--ad") {
                continue;
            }

            let href = element
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default();
            if href.is_empty() || href.contains("duckduckgo.com/y.js") {
                continue;
            }

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(|s| s.text().collect::<String>())
                .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            if snippet.is_empty() {
                continue;
            }

            snippets.push(snippet);
            if snippets.len() >= max_results {
                break;
            }
        }

        snippets
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.html_url)
            .form(&[("q", query), ("b", "")])
            .send()
            .await?;

        let status = response.status();
        // 202 is served with a challenge page when requests are throttled
        if status == StatusCode::ACCEPTED || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScoutError::Provider(format!(
                "DuckDuckGo rate limited the request (HTTP {})",
                status
            )));
        }
        if !status.is_success() {
            return Err(ScoutError::Provider(format!(
                "DuckDuckGo returned HTTP {}",
                status
            )));
        }

        let html = response.text().await?;
        let snippets = Self::parse_snippets(&html, self.max_results);
        debug!("DuckDuckGo returned {} snippets", snippets.len());

        if snippets.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(snippets.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
<div class="result results_links result--ad">
  <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Sponsored</a>
  <a class="result__snippet">Buy things now.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title"><a class="result__a" href="https://www.rust-lang.org/">Rust Programming Language</a></h2>
  <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering
     everyone to build <b>reliable</b> and efficient software.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="https://doc.rust-lang.org/book/">The Rust Book</a></h2>
  <a class="result__snippet" href="https://doc.rust-lang.org/book/">An introductory book about Rust.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="https://example.com/">No snippet</a></h2>
</div>
</body></html>"#;

    fn provider(server: &MockServer, max_results: usize) -> DuckDuckGo {
        DuckDuckGo::with_max_results(max_results)
            .unwrap()
            .with_html_url(&format!("{}/html/", server.uri()))
    }

    #[test]
    fn test_parse_snippets_skips_ads() {
        let snippets = DuckDuckGo::parse_snippets(PAGE, 10);
        assert_eq!(
            snippets,
            vec![
                "A language empowering everyone to build reliable and efficient software.",
                "An introductory book about Rust."
            ]
        );
    }

    #[test]
    fn test_parse_snippets_respects_limit() {
        assert_eq!(DuckDuckGo::parse_snippets(PAGE, 1).len(), 1);
    }

    #[tokio::test]
    async fn test_search_joins_snippets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .and(body_string_contains("q=rust+language"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let ddg = provider(&server, 5);
        let text = ddg.search("rust language").await.unwrap();
        assert_eq!(
            text,
            "A language empowering everyone to build reliable and efficient software. An introductory book about Rust."
        );
    }

    #[tokio::test]
    async fn test_throttled_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("<html>challenge</html>"))
            .mount(&server)
            .await;

        let ddg = provider(&server, 5);
        let err = ddg.search("rust language").await.unwrap_err();
        assert!(matches!(err, ScoutError::Provider(_)));
    }

    #[tokio::test]
    async fn test_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let ddg = provider(&server, 5);
        assert_eq!(ddg.search("qwxz plorb").await.unwrap(), NO_RESULT);
    }
}
