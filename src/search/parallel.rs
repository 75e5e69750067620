//! Parallel search API client.

use std::time::Duration;

use async_trait::async_trait;

use super::{SearchError, SearchProvider, SearchRequest, SearchResponse};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ParallelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ParallelClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchProvider for ParallelClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        tracing::debug!(
            objective = %request.objective,
            max_results = request.max_results,
            "Parallel search"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .timeout(SEARCH_TIMEOUT)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }
}
