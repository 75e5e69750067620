//! Web search tool backed by the search capability.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Tool;
use crate::search::{SearchProvider, SearchRequest};

pub const WEB_SEARCH_TOOL: &str = "webSearch";

const DEFAULT_MAX_RESULTS: u32 = 5;

/// Search the web through the configured provider.
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    max_chars_per_result: usize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>, max_chars_per_result: usize) -> Self {
        Self {
            provider,
            max_chars_per_result,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    objective: String,
    #[serde(default)]
    search_queries: Option<Vec<String>>,
    /// Models sometimes send `5.0`; accept any JSON number.
    #[serde(default)]
    max_results: Option<f64>,
}

#[derive(Debug, Serialize)]
struct WebSearchOutput {
    search_id: String,
    results: Vec<FormattedResult>,
    total_results: usize,
}

#[derive(Debug, Serialize)]
struct FormattedResult {
    position: usize,
    title: String,
    url: String,
    content: String,
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for current information on any topic. Use this tool to find relevant, up-to-date information before answering questions."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "objective": {
                    "type": "string",
                    "description": "Natural-language description of what you are looking for"
                },
                "search_queries": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional specific search queries to guide the search"
                },
                "max_results": {
                    "type": "number",
                    "default": DEFAULT_MAX_RESULTS,
                    "description": "Maximum number of search results to return"
                }
            },
            "required": ["objective"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: WebSearchArgs =
            serde_json::from_value(args).context("Invalid webSearch arguments")?;

        let request = SearchRequest {
            objective: args.objective,
            search_queries: args.search_queries.filter(|q| !q.is_empty()),
            max_results: args
                .max_results
                .map(|n| n.max(1.0) as u32)
                .unwrap_or(DEFAULT_MAX_RESULTS),
            max_chars_per_result: self.max_chars_per_result,
            processor: "base".to_string(),
        };

        let response = self
            .provider
            .search(&request)
            .await
            .context("Failed to search the web")?;

        let results: Vec<FormattedResult> = response
            .results
            .into_iter()
            .enumerate()
            .map(|(i, hit)| FormattedResult {
                position: i + 1,
                title: hit.title.unwrap_or_default(),
                url: hit.url,
                content: truncate_chars(&hit.excerpts.join(" "), self.max_chars_per_result),
            })
            .collect();

        let output = WebSearchOutput {
            search_id: response.search_id,
            total_results: results.len(),
            results,
        };
        Ok(serde_json::to_string(&output)?)
    }
}

/// Keep at most `max_chars` characters.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
