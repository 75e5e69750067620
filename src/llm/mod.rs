//! Chat completion capability.
//!
//! The orchestrator only talks to [`LlmClient`]; [`CerebrasClient`] is the
//! production implementation speaking the OpenAI-compatible chat completions
//! protocol.

mod cerebras;
mod retry;
mod stream;

pub use cerebras::CerebrasClient;
pub use retry::{BackoffConfig, RetryReason};
pub use stream::{FunctionDelta, ToolCallAccumulator, ToolCallDelta};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode completion response: {0}")]
    Decode(String),

    #[error("completion stream failed: {0}")]
    Stream(String),

    #[error("completion service returned no choices")]
    EmptyResponse,
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Assistant turn that requested tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Result of one tool call, answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model
    pub arguments: String,
}

/// Declaration of an invocable tool, in OpenAI `tools` format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Whether the model may call tools this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    /// Tools stay declared but the model must answer in text
    None,
}

/// One round's request to the completion capability.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolSchema],
    pub tool_choice: ToolChoice,
    pub temperature: Option<f32>,
}

/// A completed reply: final text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

/// Incremental output of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    TextDelta(String),
    /// A fully assembled tool call
    ToolCall(ToolCall),
}

pub type ChunkStream = BoxStream<'static, Result<StreamChunk, LlmError>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion and wait for the whole reply.
    async fn chat_completion(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError>;

    /// Run one completion, yielding text as it is generated.
    ///
    /// The default falls back to [`LlmClient::chat_completion`] and replays the
    /// reply as a single text delta followed by its tool calls.
    async fn chat_completion_stream(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.chat_completion(request).await?;
        let mut chunks: Vec<Result<StreamChunk, LlmError>> = Vec::new();
        if let Some(text) = response.content.filter(|t| !t.is_empty()) {
            chunks.push(Ok(StreamChunk::TextDelta(text)));
        }
        chunks.extend(response.tool_calls.into_iter().map(|c| Ok(StreamChunk::ToolCall(c))));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
