//! CLI module for Scout.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::agent::Agent;
use crate::chat::Assistant;
use crate::config::{Prompts, Settings};
use crate::tools::Toolbox;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

/// Scout - chat with search
///
/// Ask technical questions to a hosted LLM that can look things up on
/// Wikipedia, arXiv and the web before answering.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session in the terminal
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Send each question on its own, without earlier turns
        #[arg(long)]
        no_history: bool,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run one lookup tool directly
    Search {
        /// Search query
        query: String,

        /// Which tool to run
        #[arg(short, long, value_enum, default_value_t = ToolKind::Web)]
        tool: ToolKind,
    },

    /// Start the browser chat UI and HTTP API
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check API key, configuration and network access
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Lookup tool selectable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    /// Guarded DuckDuckGo search
    Web,
    Wikipedia,
    Arxiv,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

/// Load prompt templates, honouring the custom directory and variables.
pub(crate) fn load_prompts(settings: &Settings) -> crate::Result<Prompts> {
    Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )
}

/// Build an assistant for terminal commands.
pub(crate) fn build_assistant(
    settings: &Settings,
    prompts: &Prompts,
    api_key: &str,
) -> crate::Result<Assistant> {
    let toolbox = Arc::new(Toolbox::from_settings(&settings.tools)?);
    let agent = Agent::from_settings(settings, prompts, api_key, toolbox)?;
    Ok(Assistant::new(agent))
}
