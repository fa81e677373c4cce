//! Wikipedia summary lookup via the MediaWiki API.

use super::{http_client, truncate_chars, SearchProvider, PROVIDER_TIMEOUT};
use crate::config::WikipediaSettings;
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Longest query forwarded to the search API.
const MAX_QUERY_CHARS: usize = 300;

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Wikipedia search returning page intros.
pub struct Wikipedia {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl Wikipedia {
    pub fn new(settings: &WikipediaSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(PROVIDER_TIMEOUT)?,
            api_url: Self::api_url_for(&settings.lang),
            top_k_results: settings.top_k_results.max(1),
            doc_content_chars_max: settings.doc_content_chars_max,
        })
    }

    /// Point the provider at a different API endpoint.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Site root for a language setting such as "de" or "en-US".
    pub fn site_url(lang: &str) -> String {
        // "en-US" -> "en"
        let lang = lang.split('-').next().filter(|l| !l.is_empty()).unwrap_or("en");
        format!("https://{}.wikipedia.org/", lang)
    }

    fn api_url_for(lang: &str) -> String {
        format!("{}w/api.php", Self::site_url(lang))
    }

    /// Extract `(title, intro)` pairs in search order.
    fn parse_pages(json: &serde_json::Value) -> Vec<(String, String)> {
        let Some(pages) = json
            .get("query")
            .and_then(|q| q.get("pages"))
            .and_then(|p| p.as_object())
        else {
            return Vec::new();
        };

        let mut page_list: Vec<_> = pages.values().collect();
        page_list.sort_by_key(|p| p.get("index").and_then(|i| i.as_i64()).unwrap_or(i64::MAX));

        page_list
            .into_iter()
            .filter_map(|page| {
                let title = page.get("title")?.as_str()?.trim();
                let extract = page.get("extract")?.as_str()?.trim();
                if title.is_empty() || extract.is_empty() {
                    return None;
                }
                Some((title.to_string(), extract.to_string()))
            })
            .collect()
    }

    fn format_pages(&self, pages: &[(String, String)]) -> String {
        let joined = pages
            .iter()
            .map(|(title, summary)| format!("Page: {}\nSummary: {}", title, summary))
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate_chars(&joined, self.doc_content_chars_max)
    }
}

#[async_trait]
impl SearchProvider for Wikipedia {
    fn name(&self) -> &str {
        "wikipedia"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<String> {
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let limit = self.top_k_results.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query.as_str()),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", limit.as_str()),
                ("redirects", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoutError::Provider(format!(
                "Wikipedia returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        let pages = Self::parse_pages(&json);
        debug!("Wikipedia returned {} pages", pages.len());

        if pages.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(self.format_pages(&pages))
    }
}
