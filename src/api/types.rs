//! API request and response types.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/research`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPayload {
    /// The user's question
    #[serde(default)]
    pub query: Option<String>,

    /// Optional system prompt override
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// JSON failure body used by the streaming transport.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
