//! Agent module - the research orchestrator.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build the conversation from the system prompt and the user query
//! 2. Call the LLM with the available tools
//! 3. If the LLM requests tool calls, execute them and feed the results back
//! 4. Repeat until the LLM produces a final answer or the step budget is spent
//!
//! On the last permitted round tools stay declared but `tool_choice` is
//! `none`, so the model has to answer with whatever it has gathered.

mod agent_loop;
mod conversation;
mod events;
mod prompt;

pub use agent_loop::{AgentSettings, ResearchAgent, ResearchAnswer, ResearchQuery};
pub use conversation::Conversation;
pub use events::ResearchEvent;
pub use prompt::{build_system_prompt, DEFAULT_SYSTEM_PROMPT};

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Query is required")]
    EmptyQuery,

    #[error(transparent)]
    Completion(#[from] LlmError),

    #[error("event stream closed by the client")]
    StreamClosed,
}
