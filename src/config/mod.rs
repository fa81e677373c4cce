//! Configuration module for Scout.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, ChatPrompts, Prompts};
pub use settings::{
    AgentSettings, ArxivSettings, ChatSettings, GeneralSettings, LlmSettings, PromptSettings,
    RetrySettings, ServerSettings, Settings, ToolSettings, WebSearchSettings, WikipediaSettings,
};
