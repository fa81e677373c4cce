//! arXiv abstract search via the Atom export API.

use super::{http_client, truncate_chars, SearchProvider, PROVIDER_TIMEOUT};
use crate::config::ArxivSettings;
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// The API rejects very long search queries.
const MAX_QUERY_CHARS: usize = 300;

const NO_RESULT: &str = "No good Arxiv Result was found";

/// A paper entry from the Atom feed.
#[derive(Debug, Clone, PartialEq)]
struct Paper {
    title: String,
    authors: Vec<String>,
    summary: String,
    /// `YYYY-MM-DD` of the latest version.
    date: String,
}

/// arXiv search returning paper abstracts.
pub struct Arxiv {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl Arxiv {
    pub fn new(settings: &ArxivSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(PROVIDER_TIMEOUT)?,
            api_url: "https://export.arxiv.org/api/query".to_string(),
            top_k_results: settings.top_k_results.max(1),
            doc_content_chars_max: settings.doc_content_chars_max,
        })
    }

    /// Point the provider at a different API endpoint.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    fn parse_feed(xml: &str) -> Vec<Paper> {
        let mut papers = Vec::new();

        for entry_str in xml.split("<entry>").skip(1) {
            let Some(end) = entry_str.find("</entry>") else {
                continue;
            };
            let entry = &entry_str[..end];

            let title = Self::extract_tag(entry, "title")
                .map(|t| clean_text(&t))
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let summary = Self::extract_tag(entry, "summary")
                .map(|s| clean_text(&s))
                .unwrap_or_default();

            let authors = entry
                .split("<author>")
                .skip(1)
                .filter_map(|block| Self::extract_tag(block, "name"))
                .map(|name| clean_text(&name))
                .collect();

            let date = Self::extract_tag(entry, "updated")
                .or_else(|| Self::extract_tag(entry, "published"))
                .map(|d| d.trim().chars().take(10).collect())
                .unwrap_or_default();

            papers.push(Paper {
                title,
                authors,
                summary,
                date,
            });
        }

        papers
    }

    /// Extract text content from an XML tag.
    fn extract_tag(xml: &str, tag: &str) -> Option<String> {
        let start_tag = format!("<{}", tag);
        let end_tag = format!("</{}>", tag);

        let start = xml.find(&start_tag)?;
        let content_start = xml[start..].find('>')? + start + 1;
        let end = xml[content_start..].find(&end_tag)? + content_start;

        Some(xml[content_start..end].to_string())
    }

    fn format_papers(&self, papers: &[Paper]) -> String {
        let joined = papers
            .iter()
            .map(|p| {
                format!(
                    "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                    p.date,
                    p.title,
                    p.authors.join(", "),
                    p.summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate_chars(&joined, self.doc_content_chars_max)
    }
}

/// Collapse whitespace and decode the entities arXiv emits.
fn clean_text(raw: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let collapsed = whitespace.replace_all(raw.trim(), " ");
    collapsed
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait]
impl SearchProvider for Arxiv {
    fn name(&self) -> &str {
        "arxiv"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<String> {
        let search_query = format!("all:{}", truncate_chars(query, MAX_QUERY_CHARS));
        let max_results = self.top_k_results.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoutError::Provider(format!(
                "arXiv returned HTTP {}",
                response.status()
            )));
        }

        let xml = response.text().await?;
        let mut papers = Self::parse_feed(&xml);
        papers.truncate(self.top_k_results);
        debug!("arXiv returned {} papers", papers.len());

        if papers.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(self.format_papers(&papers))
    }
}
