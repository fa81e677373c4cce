//! A single conversation.

use super::{Answer, Assistant};
use crate::config::{ChatSettings, Prompts};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A conversation that always opens with the assistant greeting.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    greeting: String,
    inject_history: bool,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(greeting: &str, inject_history: bool) -> Self {
        Self::with_id(Uuid::new_v4(), greeting, inject_history)
    }

    pub fn with_id(id: Uuid, greeting: &str, inject_history: bool) -> Self {
        Self {
            id,
            greeting: greeting.to_string(),
            inject_history,
            messages: vec![ChatMessage::new(Role::Assistant, greeting)],
        }
    }

    pub fn from_settings(settings: &ChatSettings) -> Self {
        Self::new(&settings.greeting, settings.inject_history)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drop everything but a fresh greeting.
    pub fn clear(&mut self) {
        self.messages = vec![ChatMessage::new(Role::Assistant, &self.greeting)];
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(ChatMessage::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(ChatMessage::new(Role::Assistant, content));
    }

    /// Earlier turns as `Role: content` lines.
    ///
    /// Skips the greeting and the most recent message, which is the prompt
    /// being answered.
    pub fn history_text(&self) -> String {
        if self.messages.len() < 2 {
            return String::new();
        }

        self.messages[1..self.messages.len() - 1]
            .iter()
            .map(|m| format!("{}: {}\n", m.role.label(), m.content))
            .collect()
    }

    /// The text sent to the agent for `prompt`.
    pub fn augmented_prompt(&self, prompts: &Prompts, prompt: &str) -> String {
        if !self.inject_history {
            return prompt.to_string();
        }

        let history = self.history_text();
        if history.is_empty() {
            return prompt.to_string();
        }

        let mut vars = HashMap::new();
        vars.insert("history".to_string(), history);
        vars.insert("question".to_string(), prompt.to_string());
        prompts.render_with_custom(&prompts.chat.history, &vars)
    }

    /// Record `prompt`, answer it and record the reply.
    ///
    /// On error the prompt stays recorded and no reply is added.
    pub async fn ask(
        &mut self,
        assistant: &Assistant,
        prompts: &Prompts,
        prompt: &str,
    ) -> Result<Answer> {
        self.push_user(prompt);
        let augmented = self.augmented_prompt(prompts, prompt);
        let answer = assistant.answer(&augmented).await?;
        self.push_assistant(&answer.text);
        Ok(answer)
    }
}
