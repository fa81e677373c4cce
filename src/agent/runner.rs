//! Agent runner with tool calling loop.

use crate::config::{Prompts, Settings};
use crate::error::{Result, ScoutError};
use crate::openai::{create_client, LlmClient};
use crate::tools::{parse_tool_call, tool_definitions, Toolbox};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Content of a run that hit one of its limits.
pub const LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Agent that answers with the help of the lookup tools.
pub struct Agent {
    client: LlmClient,
    model: String,
    fallback_model: String,
    temperature: f32,
    tools: Arc<Toolbox>,
    max_iterations: usize,
    max_execution_time: Duration,
    system_prompt: String,
}

/// Progress kept outside the timed future so a timeout can still report it.
#[derive(Default)]
struct RunState {
    iterations: usize,
    tool_calls: Vec<ToolCallRecord>,
}

impl Agent {
    /// Create a new agent with default limits.
    pub fn new(client: LlmClient, model: &str, tools: Arc<Toolbox>) -> Self {
        Self {
            client,
            model: model.to_string(),
            fallback_model: model.to_string(),
            temperature: 0.1,
            tools,
            max_iterations: 5,
            max_execution_time: Duration::from_secs(60),
            system_prompt: Prompts::default().agent_system(),
        }
    }

    /// Create an agent configured from settings and prompts.
    pub fn from_settings(
        settings: &Settings,
        prompts: &Prompts,
        api_key: &str,
        tools: Arc<Toolbox>,
    ) -> Result<Self> {
        let client = create_client(&settings.llm, api_key)?;
        Ok(Self::new(client, &settings.llm.model, tools)
            .with_fallback_model(&settings.agent.fallback_model)
            .with_temperature(settings.llm.temperature)
            .with_max_iterations(settings.agent.max_iterations)
            .with_max_execution_time(settings.agent.max_execution_time())
            .with_system_prompt(&prompts.agent_system()))
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the wall-clock budget for a run.
    pub fn with_max_execution_time(mut self, max: Duration) -> Self {
        self.max_execution_time = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the model used by [`Agent::complete`].
    pub fn with_fallback_model(mut self, model: &str) -> Self {
        self.fallback_model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the agent on a prompt.
    ///
    /// Hitting the iteration or time limit is not an error: the response
    /// carries [`LIMIT_MESSAGE`] and the matching [`StopReason`].
    pub async fn run(&self, task: &str) -> Result<AgentResponse> {
        let mut state = RunState::default();

        let outcome =
            tokio::time::timeout(self.max_execution_time, self.run_loop(task, &mut state)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Agent exceeded its time limit ({:?}) after {} iteration(s)",
                    self.max_execution_time, state.iterations
                );
                Ok(AgentResponse::stopped(state, StopReason::TimeLimit))
            }
        }
    }

    async fn run_loop(&self, task: &str, state: &mut RunState) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| ScoutError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(task)
                .build()
                .map_err(|e| ScoutError::Agent(e.to_string()))?
                .into(),
        ];

        loop {
            if state.iterations >= self.max_iterations {
                warn!("Agent reached its iteration limit ({})", self.max_iterations);
                return Ok(AgentResponse::stopped(
                    std::mem::take(state),
                    StopReason::IterationLimit,
                ));
            }
            state.iterations += 1;

            debug!("Agent iteration {}, {} messages", state.iterations, messages.len());

            let request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(messages.clone())
                .tools(tool_definitions())
                .temperature(self.temperature)
                .build()
                .map_err(|e| ScoutError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| ScoutError::OpenAI(format!("Agent API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| ScoutError::Agent("No response from model".to_string()))?;

            let tool_calls = match &choice.message.tool_calls {
                Some(calls) if !calls.is_empty() => calls,
                _ => {
                    let content = choice.message.content.clone().unwrap_or_default();
                    return Ok(AgentResponse {
                        content,
                        tool_calls: std::mem::take(&mut state.tool_calls),
                        iterations: state.iterations,
                        stop_reason: StopReason::Completed,
                    });
                }
            };

            let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(tool_calls.clone())
                .build()
                .map_err(|e| ScoutError::Agent(e.to_string()))?;
            messages.push(assistant_msg.into());

            for tool_call in tool_calls {
                let record = self.execute_tool_call(tool_call).await?;

                let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(&tool_call.id)
                    .content(record.result.clone())
                    .build()
                    .map_err(|e| ScoutError::Agent(e.to_string()))?;
                messages.push(tool_msg.into());

                state.tool_calls.push(record);
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    ///
    /// A malformed call is reported back to the model as text. A failing
    /// tool ends the run with its error so the caller can answer without tools.
    async fn execute_tool_call(
        &self,
        tool_call: &ChatCompletionMessageToolCall,
    ) -> Result<ToolCallRecord> {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match parse_tool_call(name, arguments) {
            Ok(tool) => self.tools.execute(&tool).await.map_err(|e| {
                warn!("Tool {} failed: {}", name, e);
                e
            })?,
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        Ok(ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        })
    }

    /// A single tool-free completion with the fallback model.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.fallback_model)
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ScoutError::Agent(e.to_string()))?
                .into()])
            .build()
            .map_err(|e| ScoutError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ScoutError::OpenAI(format!("Completion API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ScoutError::Agent("Empty response from model".to_string()))
    }
}

/// Why an agent run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered without requesting more tools.
    Completed,
    IterationLimit,
    TimeLimit,
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
    pub stop_reason: StopReason,
}

impl AgentResponse {
    fn stopped(state: RunState, stop_reason: StopReason) -> Self {
        Self {
            content: LIMIT_MESSAGE.to_string(),
            tool_calls: state.tool_calls,
            iterations: state.iterations,
            stop_reason,
        }
    }

    /// Whether the run ended on a limit rather than a real answer.
    pub fn hit_limit(&self) -> bool {
        if self.stop_reason != StopReason::Completed {
            return true;
        }
        let lowered = self.content.to_lowercase();
        lowered.contains("iteration limit") || lowered.contains("time limit")
    }
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
