//! Cerebras chat completions client (OpenAI-compatible wire format).

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::retry::{BackoffConfig, RetryReason};
use super::stream::{parse_chunk, ToolCallAccumulator};
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChunkStream, LlmClient, LlmError, StreamChunk,
    ToolCall, ToolChoice, ToolSchema,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct CerebrasClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff: BackoffConfig,
}

impl CerebrasClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries: 2,
            backoff: BackoffConfig::default(),
        }
    }

    /// Number of retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ChatRequest<'_>, stream: bool) -> Result<Value, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: request.messages,
            tools: request.tools,
            tool_choice: (!request.tools.is_empty()).then_some(request.tool_choice),
            temperature: request.temperature,
            stream,
        };
        serde_json::to_value(&body).map_err(|e| LlmError::Decode(e.to_string()))
    }

    /// POST the body, retrying transient failures with exponential backoff.
    async fn send_with_retry(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .http
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .timeout(REQUEST_TIMEOUT)
                .json(body)
                .send()
                .await;

            let (reason, err) = match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    let err = LlmError::Api { status, body };
                    match RetryReason::from_status(status) {
                        Some(reason) => (reason, err),
                        None => return Err(err),
                    }
                }
                Err(e) => match RetryReason::from_transport(&e) {
                    Some(reason) => (reason, LlmError::Http(e)),
                    None => return Err(LlmError::Http(e)),
                },
            };

            if attempt >= self.max_retries {
                return Err(err);
            }

            let delay = self.backoff.delay_for(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "Completion request failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl LlmClient for CerebrasClient {
    async fn chat_completion(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let body = self.request_body(request, false)?;
        let response = self.send_with_retry(&body).await?;
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChunkStream, LlmError> {
        let body = self.request_body(request, true)?;
        let builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body);
        let mut source = EventSource::new(builder).map_err(|e| LlmError::Stream(e.to_string()))?;
        source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        let stream = async_stream::stream! {
            let mut tool_calls = ToolCallAccumulator::new();
            let mut failed = false;

            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(message)) => {
                        if message.data.trim() == "[DONE]" {
                            break;
                        }
                        match parse_chunk(&message.data) {
                            Ok(chunk) => {
                                for choice in chunk.choices {
                                    if let Some(reason) = &choice.finish_reason {
                                        tracing::debug!(finish_reason = %reason, "Completion stream finished");
                                    }
                                    if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                                        yield Ok(StreamChunk::TextDelta(text));
                                    }
                                    for delta in choice.delta.tool_calls {
                                        tool_calls.push(delta);
                                    }
                                }
                            }
                            Err(e) => {
                                failed = true;
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                        failed = true;
                        let body = response.text().await.unwrap_or_default();
                        yield Err(LlmError::Api { status: status.as_u16(), body });
                        break;
                    }
                    Err(e) => {
                        failed = true;
                        yield Err(LlmError::Stream(e.to_string()));
                        break;
                    }
                }
            }
            source.close();

            if !failed {
                for call in tool_calls.finish() {
                    yield Ok(StreamChunk::ToolCall(call));
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSchema],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

fn no_tools(tools: &&[ToolSchema]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}
