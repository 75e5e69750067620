//! # Research Worker
//!
//! A small web research service.
//!
//! This library provides:
//! - An HTTP API that answers natural-language research queries
//! - A tool-calling agent loop with a single web search tool
//! - Clients for Cerebras chat completions and the Parallel search API
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a query via the API
//! 2. Build the conversation from the system prompt and the query
//! 3. Call the LLM, execute any requested searches
//! 4. Feed results back to the LLM, repeat until it answers or the step budget runs out
//!
//! The answer is returned either as one plain-text body or as a server-sent
//! event stream, depending on `RESEARCH_MODE`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use research_worker::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod search;
pub mod tools;

pub use config::Config;
