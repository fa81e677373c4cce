//! Agent system for question answering with tool calling.
//!
//! Provides an LLM agent that can consult Wikipedia, arXiv and the guarded
//! web search before answering, bounded by an iteration count and a
//! wall-clock budget.

mod runner;

pub use runner::{Agent, AgentResponse, StopReason, ToolCallRecord, LIMIT_MESSAGE};

#[cfg(test)]
pub(crate) use runner::tests as test_support;
