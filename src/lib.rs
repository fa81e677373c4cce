//! Scout - chat with search
//!
//! A technical Q&A assistant: a hosted LLM answers questions and may look
//! things up on Wikipedia, arXiv or the web first.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `gate` - Validation, connectivity probe and retry in front of web search
//! - `tools` - Wikipedia, arXiv and DuckDuckGo providers and the tool registry
//! - `agent` - Bounded tool-calling loop against the chat completions API
//! - `chat` - Sessions, history injection and the fallback answer policy
//! - `cli` - Terminal commands and the browser chat server
//!
//! # Example
//!
//! ```rust,no_run
//! use scout::gate::QueryGate;
//! use scout::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let gate = QueryGate::from_settings(&settings.tools.web_search)?;
//!
//!     println!("{}", gate.search("tokio runtime internals").await?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod openai;
pub mod tools;

pub use error::{Result, ScoutError};
