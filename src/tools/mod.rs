//! Lookup tools exposed to the agent.
//!
//! Each backend implements [`SearchProvider`]. The [`Toolbox`] maps the
//! model's function calls onto them; web searches go through the
//! [`QueryGate`](crate::gate::QueryGate).

mod arxiv;
mod duckduckgo;
mod wikipedia;

pub use arxiv::Arxiv;
pub use duckduckgo::DuckDuckGo;
pub use wikipedia::Wikipedia;

use crate::config::ToolSettings;
use crate::error::{Result, ScoutError};
use crate::gate::QueryGate;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// User agent sent by every outgoing lookup request.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) scout/",
    env!("CARGO_PKG_VERSION")
);

/// Default timeout for provider requests.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);

/// A backend that answers a text query with text.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Run the query and return a plain-text answer.
    async fn search(&self, query: &str) -> Result<String>;
}

/// Build the HTTP client shared by providers and the probe.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Keep at most `max` characters, respecting char boundaries.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Tools the model can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Encyclopedia summary.
    Wikipedia { query: String },

    /// Research paper abstracts.
    Arxiv { query: String },

    /// Guarded web search.
    SafeSearch { query: String },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Wikipedia { .. } => "wikipedia",
            ToolCall::Arxiv { .. } => "arxiv",
            ToolCall::SafeSearch { .. } => "safe_search",
        }
    }

    pub fn query(&self) -> &str {
        match self {
            ToolCall::Wikipedia { query }
            | ToolCall::Arxiv { query }
            | ToolCall::SafeSearch { query } => query,
        }
    }
}

/// The three lookup tools behind one dispatch point.
pub struct Toolbox {
    wikipedia: Arc<dyn SearchProvider>,
    arxiv: Arc<dyn SearchProvider>,
    web: QueryGate,
}

impl Toolbox {
    /// Create a toolbox from its parts.
    pub fn new(
        wikipedia: Arc<dyn SearchProvider>,
        arxiv: Arc<dyn SearchProvider>,
        web: QueryGate,
    ) -> Self {
        Self {
            wikipedia,
            arxiv,
            web,
        }
    }

    /// Create the real providers described by the settings.
    pub fn from_settings(settings: &ToolSettings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(Wikipedia::new(&settings.wikipedia)?),
            Arc::new(Arxiv::new(&settings.arxiv)?),
            QueryGate::from_settings(&settings.web_search)?,
        ))
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::Wikipedia { query } => self.wikipedia.search(query).await,
            ToolCall::Arxiv { query } => self.arxiv.search(query).await,
            ToolCall::SafeSearch { query } => self.web.search(query).await,
        }
    }
}

fn query_tool(name: &str, description: &str, query_hint: &str) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": query_hint
                    }
                },
                "required": ["query"]
            })),
            strict: None,
        },
    }
}

/// Get OpenAI function/tool definitions for the agent.
pub fn tool_definitions() -> Vec<ChatCompletionTool> {
    vec![
        query_tool(
            "wikipedia",
            "Look up a short Wikipedia summary. Useful for general questions about \
            people, places, companies, history, science and other well-known subjects.",
            "Topic to look up",
        ),
        query_tool(
            "arxiv",
            "Search arXiv for research papers and return the best match's abstract. \
            Useful for questions about physics, mathematics, computer science, \
            statistics and related fields.",
            "Paper title, topic or keywords",
        ),
        query_tool(
            "safe_search",
            "Safe web search tool. Use for factual public info only. \
            Queries need at least two words and must not use search operators.",
            "Web search query",
        ),
    ]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| ScoutError::Agent(format!("Invalid tool arguments: {}", e)))?;

    let query = || -> Result<String> {
        args["query"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScoutError::Agent("Missing 'query' argument".to_string()))
    };

    match name {
        "wikipedia" => Ok(ToolCall::Wikipedia { query: query()? }),
        "arxiv" => Ok(ToolCall::Arxiv { query: query()? }),
        "safe_search" => Ok(ToolCall::SafeSearch { query: query()? }),
        _ => Err(ScoutError::Agent(format!("Unknown tool: {}", name))),
    }
}
