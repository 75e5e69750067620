//! Core agent loop implementation.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::llm::{
    ChatMessage, ChatRequest, ChatResponse, LlmClient, StreamChunk, ToolCall, ToolChoice,
};
use crate::tools::ToolRegistry;

use super::conversation::Conversation;
use super::events::ResearchEvent;
use super::prompt::build_system_prompt;
use super::ResearchError;

/// A validated research request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchQuery {
    query: String,
    system_prompt: String,
}

impl ResearchQuery {
    /// # Errors
    ///
    /// Returns `ResearchError::EmptyQuery` if `query` is empty or whitespace.
    pub fn new(query: impl Into<String>, system_prompt: Option<&str>) -> Result<Self, ResearchError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ResearchError::EmptyQuery);
        }
        Ok(Self {
            query,
            system_prompt: build_system_prompt(system_prompt),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

/// Loop limits and sampling settings.
#[derive(Debug, Clone, Copy)]
pub struct AgentSettings {
    /// Maximum rounds, counting the final forced-answer round
    pub max_steps: usize,
    pub temperature: Option<f32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 10,
            temperature: Some(0.1),
        }
    }
}

impl From<&Config> for AgentSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_steps: config.max_steps,
            temperature: Some(config.temperature),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ResearchAnswer {
    /// Final answer text; may be empty if the budget ran out mid-research
    pub text: String,
    /// Rounds performed
    pub steps: usize,
    pub conversation: Conversation,
}

/// The research agent: one completion client, one tool registry.
pub struct ResearchAgent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    settings: AgentSettings,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, settings: AgentSettings) -> Self {
        let settings = AgentSettings {
            max_steps: settings.max_steps.max(1),
            ..settings
        };
        Self {
            llm,
            tools,
            settings,
        }
    }

    /// Run to completion and return the final answer.
    pub async fn research(&self, query: &ResearchQuery) -> Result<ResearchAnswer, ResearchError> {
        self.run(query, EventSink(None)).await
    }

    /// Run to completion, sending progress events as they happen.
    ///
    /// Terminal events (`done`, `error`) are left to the caller. Fails with
    /// `ResearchError::StreamClosed` once the receiver is gone.
    pub async fn research_streaming(
        &self,
        query: &ResearchQuery,
        events: &mpsc::Sender<ResearchEvent>,
    ) -> Result<ResearchAnswer, ResearchError> {
        self.run(query, EventSink(Some(events))).await
    }

    async fn run(
        &self,
        query: &ResearchQuery,
        sink: EventSink<'_>,
    ) -> Result<ResearchAnswer, ResearchError> {
        let tool_schemas = self.tools.get_tool_schemas();
        let mut conversation = Conversation::start(query.system_prompt(), query.query());
        let mut step = 0usize;

        tracing::info!(
            max_steps = self.settings.max_steps,
            streaming = sink.is_streaming(),
            "Research started"
        );

        loop {
            step += 1;
            let final_round = step >= self.settings.max_steps;
            tracing::debug!("Research round {} (final: {})", step, final_round);

            let request = ChatRequest {
                messages: conversation.messages(),
                tools: &tool_schemas,
                tool_choice: if final_round {
                    ToolChoice::None
                } else {
                    ToolChoice::Auto
                },
                temperature: self.settings.temperature,
            };

            let reply = if sink.is_streaming() {
                self.stream_reply(&request, &sink).await?
            } else {
                self.llm.chat_completion(&request).await?
            };
            tracing::debug!(
                step,
                finish_reason = reply.finish_reason.as_deref().unwrap_or("none"),
                tool_calls = reply.tool_calls.len(),
                "Completion round finished"
            );

            if reply.tool_calls.is_empty() || final_round {
                if !reply.tool_calls.is_empty() {
                    tracing::warn!(
                        step,
                        ignored_calls = reply.tool_calls.len(),
                        "Step budget exhausted; returning last reply"
                    );
                }
                let text = reply.content.unwrap_or_default();
                tracing::info!(steps = step, answer_len = text.len(), "Research completed");
                return Ok(ResearchAnswer {
                    text,
                    steps: step,
                    conversation,
                });
            }

            let mut results = Vec::with_capacity(reply.tool_calls.len());
            for tool_call in &reply.tool_calls {
                tracing::debug!(
                    tool = %tool_call.function.name,
                    args = %tool_call.function.arguments,
                    "Calling tool"
                );
                sink.emit(ResearchEvent::ToolCall {
                    id: tool_call.id.clone(),
                    name: tool_call.function.name.clone(),
                    args: parse_arguments(&tool_call.function.arguments)
                        .unwrap_or_else(|_| Value::String(tool_call.function.arguments.clone())),
                })
                .await?;

                let outcome = self.execute_tool_call(tool_call).await;

                sink.emit(ResearchEvent::ToolResult {
                    id: tool_call.id.clone(),
                    name: tool_call.function.name.clone(),
                    result: outcome.result,
                    is_error: outcome.is_error,
                })
                .await?;

                results.push(ChatMessage::tool_result(&tool_call.id, outcome.content));
            }

            conversation = conversation.with_tool_round(
                ChatMessage::assistant_tool_calls(reply.content, reply.tool_calls),
                results,
            );
        }
    }

    /// Drain one streamed completion, forwarding text as it arrives.
    async fn stream_reply(
        &self,
        request: &ChatRequest<'_>,
        sink: &EventSink<'_>,
    ) -> Result<ChatResponse, ResearchError> {
        let mut chunks = self.llm.chat_completion_stream(request).await?;
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        while let Some(chunk) = chunks.next().await {
            match chunk? {
                StreamChunk::TextDelta(delta) => {
                    text.push_str(&delta);
                    sink.emit(ResearchEvent::TextDelta { text: delta }).await?;
                }
                StreamChunk::ToolCall(call) => tool_calls.push(call),
            }
        }

        Ok(ChatResponse {
            content: (!text.is_empty()).then_some(text),
            tool_calls,
            finish_reason: None,
        })
    }

    /// Execute a single tool call. Failures become tool content for the model.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> ToolOutcome {
        let args = match parse_arguments(&tool_call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                return ToolOutcome::failed(
                    &anyhow::Error::new(e).context("Tool arguments are not valid JSON"),
                )
            }
        };

        match self.tools.execute(&tool_call.function.name, args).await {
            Ok(content) => {
                let result = serde_json::from_str(&content)
                    .unwrap_or_else(|_| Value::String(content.clone()));
                ToolOutcome {
                    content,
                    result,
                    is_error: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    tool = %tool_call.function.name,
                    error = %format!("{:#}", e),
                    "Tool call failed; returning error to model"
                );
                ToolOutcome::failed(&e)
            }
        }
    }
}

struct ToolOutcome {
    /// What the model sees
    content: String,
    result: Value,
    is_error: bool,
}

impl ToolOutcome {
    fn failed(err: &anyhow::Error) -> Self {
        let result = json!({
            "error": err.to_string(),
            "details": err.root_cause().to_string(),
        });
        Self {
            content: result.to_string(),
            result,
            is_error: true,
        }
    }
}

/// Where progress events go; `None` in buffered mode.
struct EventSink<'a>(Option<&'a mpsc::Sender<ResearchEvent>>);

impl EventSink<'_> {
    fn is_streaming(&self) -> bool {
        self.0.is_some()
    }

    async fn emit(&self, event: ResearchEvent) -> Result<(), ResearchError> {
        match self.0 {
            Some(tx) => tx.send(event).await.map_err(|_| ResearchError::StreamClosed),
            None => Ok(()),
        }
    }
}

/// Models send `""` for argument-less calls.
fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}
