//! Prompt templates for Scout.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub chat: ChatPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the tool-calling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful technical assistant. Answer the user's question as accurately as you can.

You have three lookup tools:
- 'wikipedia' returns a short encyclopedia summary for a topic
- 'arxiv' returns the abstract of a matching research paper
- 'safe_search' runs a web search for factual public information

Guidelines:
- Answer directly when you already know the answer; tools are optional
- Give tools short, specific queries of at least two words
- Do not put search operators such as "site:" in queries
- Stop calling tools once you have enough information

Be concise and mention which source a fact came from when you used a tool."#
                .to_string(),
        }
    }
}

/// Prompts for chat sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    /// Wraps the current question when earlier turns exist.
    /// `{{history}}` is one `Role: content` line per earlier message.
    pub history: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            history: "Previous conversation:\n{{history}}\nCurrent question: {{question}}"
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass: placeholders inside substituted values
    /// are left as they are. Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let placeholder = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));
        placeholder
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The agent system prompt with custom variables applied.
    pub fn agent_system(&self) -> String {
        Self::render(&self.agent.system, &self.variables)
    }
}
