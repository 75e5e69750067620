use serde::Serialize;
use serde_json::Value;

/// Progress of a streamed research run.
///
/// Serialized at the transport boundary as `{"type": "<kind>", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResearchEvent {
    /// The model asked for a tool call.
    ToolCall {
        id: String,
        name: String,
        args: Value,
    },
    /// Tool execution completed (or failed; see `is_error`).
    ToolResult {
        id: String,
        name: String,
        result: Value,
        is_error: bool,
    },
    /// Answer text being streamed.
    TextDelta { text: String },
    /// Error occurred; nothing follows.
    Error { message: String },
    /// Research completed after `steps` rounds.
    Done { steps: usize },
}

impl ResearchEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
            Self::TextDelta { .. } => "text-delta",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    /// True for the events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done { .. })
    }
}
