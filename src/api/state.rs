//! Shared server state and the factory for per-request backends.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentSettings, ResearchAgent};
use crate::config::{Config, Credentials};
use crate::llm::{CerebrasClient, LlmClient};
use crate::search::{ParallelClient, SearchProvider};
use crate::tools::ToolRegistry;

/// Builds the completion and search capabilities for one request.
pub trait Backends: Send + Sync {
    fn completion(&self, credentials: &Credentials) -> Arc<dyn LlmClient>;

    fn search(&self, credentials: &Credentials) -> Arc<dyn SearchProvider>;
}

/// Production backends: Cerebras completions and Parallel search.
pub struct HttpBackends {
    http: reqwest::Client,
    config: Config,
}

impl HttpBackends {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("research-worker/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }
}

impl Backends for HttpBackends {
    fn completion(&self, credentials: &Credentials) -> Arc<dyn LlmClient> {
        Arc::new(
            CerebrasClient::new(
                self.http.clone(),
                &self.config.completion_base_url,
                &credentials.completion_api_key,
                &self.config.model,
            )
            .with_max_retries(self.config.max_retries),
        )
    }

    fn search(&self, credentials: &Credentials) -> Arc<dyn SearchProvider> {
        Arc::new(ParallelClient::new(
            self.http.clone(),
            &self.config.search_base_url,
            &credentials.search_api_key,
        ))
    }
}

pub struct AppState {
    pub config: Config,
    pub backends: Arc<dyn Backends>,
}

impl AppState {
    pub fn new(config: Config, backends: Arc<dyn Backends>) -> Self {
        Self { config, backends }
    }

    /// A fresh agent for one request; nothing is shared between requests.
    pub fn agent_for(&self, credentials: &Credentials) -> ResearchAgent {
        let tools = ToolRegistry::for_research(
            self.backends.search(credentials),
            self.config.mode.max_chars_per_result(),
        );
        ResearchAgent::new(
            self.backends.completion(credentials),
            tools,
            AgentSettings::from(&self.config),
        )
    }
}
