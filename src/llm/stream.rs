//! Decoding of streamed chat completion chunks.
//!
//! Text arrives as `delta.content` fragments and can be forwarded as-is. Tool
//! calls arrive as `delta.tool_calls` fragments keyed by `index`: the first
//! fragment carries the id and name, later ones append to `arguments`.

use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use super::{LlmError, ToolCall};

#[derive(Debug, Deserialize)]
pub(crate) struct StreamResponse {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Delta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Decode one `data:` payload of the completion stream.
pub(crate) fn parse_chunk(data: &str) -> Result<StreamResponse, LlmError> {
    serde_json::from_str(data).map_err(|e| LlmError::Decode(format!("{}: {}", e, data)))
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Assembles tool calls from streamed fragments.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: ToolCallDelta) {
        let call = self.calls.entry(delta.index).or_default();
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            call.id = Some(id);
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                call.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                call.arguments.push_str(&arguments);
            }
        }
    }

    /// Complete calls in index order. Calls that never received a name are dropped.
    pub fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| {
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
                ToolCall::new(id, call.name, call.arguments)
            })
            .collect()
    }
}
