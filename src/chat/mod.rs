//! Chat sessions and the answer policy behind them.
//!
//! Each turn goes to the tool-calling agent first. When the agent fails or
//! runs into its iteration/time limit, the same prompt is answered by a
//! direct completion instead.

mod session;
mod store;

pub use session::{ChatMessage, ChatSession, Role};
pub use store::{SessionHandle, SessionStore};

use crate::agent::{Agent, ToolCallRecord};
use crate::error::Result;
use serde::Serialize;
use tracing::{info, warn};

/// Shown instead of an answer when no API key is available.
pub const MISSING_KEY_MESSAGE: &str = "⚠️ Please enter your GROQ API key!";

/// A reply to one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Tool calls the agent made on the way.
    pub steps: Vec<ToolCallRecord>,
    /// Whether the direct completion produced the text.
    pub fallback: bool,
}

/// Answers prompts with the agent, falling back to a direct completion.
pub struct Assistant {
    agent: Agent,
}

impl Assistant {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub async fn answer(&self, prompt: &str) -> Result<Answer> {
        match self.agent.run(prompt).await {
            Ok(response) if !response.hit_limit() => Ok(Answer {
                text: response.content,
                steps: response.tool_calls,
                fallback: false,
            }),
            Ok(response) => {
                info!(
                    "Agent stopped ({:?}) after {} iteration(s), answering directly",
                    response.stop_reason, response.iterations
                );
                let text = self.agent.complete(prompt).await?;
                Ok(Answer {
                    text,
                    steps: response.tool_calls,
                    fallback: true,
                })
            }
            Err(e) => {
                warn!("Agent failed, answering directly: {}", e);
                let text = self.agent.complete(prompt).await?;
                Ok(Answer {
                    text,
                    steps: Vec::new(),
                    fallback: true,
                })
            }
        }
    }
}
