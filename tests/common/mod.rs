#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use research_worker::api::{build_router, AppState, Backends};
use research_worker::config::{Config, Credentials, ResearchMode};
use research_worker::llm::{
    ChatRequest, ChatResponse, ChunkStream, LlmClient, LlmError, Role, StreamChunk, ToolCall,
};
use research_worker::search::{
    SearchError, SearchHit, SearchProvider, SearchRequest, SearchResponse,
};
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

pub const FRANCE_ANSWER: &str = "The capital of France is Paris.";

/// How the stub model behaves.
#[derive(Debug, Clone)]
pub enum Script {
    /// Search for "capital of France" once, then answer.
    France,
    /// Request a search every round, even when told not to.
    AlwaysSearch,
    /// Every completion fails.
    Fail,
    /// Stream `n` text deltas, then fail.
    PartialThenFail(usize),
}

/// Deterministic completion stub: the reply depends only on the conversation.
pub struct StubLlm {
    script: Script,
    calls: AtomicUsize,
    system_prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            system_prompts: Mutex::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.system_prompts.lock().unwrap().clone()
    }

    fn record(&self, request: &ChatRequest<'_>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(system) = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| m.content.clone())
        {
            self.system_prompts.lock().unwrap().push(system);
        }
    }
}

fn search_call(id: &str, objective: &str) -> ChatResponse {
    ChatResponse {
        content: None,
        tool_calls: vec![ToolCall::new(
            id,
            "webSearch",
            json!({ "objective": objective }).to_string(),
        )],
        finish_reason: Some("tool_calls".into()),
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn chat_completion(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        self.record(request);
        let searched = request.messages.iter().any(|m| m.role == Role::Tool);
        match &self.script {
            Script::France if !searched => Ok(search_call("call_1", "capital of France")),
            Script::France => Ok(ChatResponse {
                content: Some(FRANCE_ANSWER.to_string()),
                tool_calls: vec![],
                finish_reason: Some("stop".into()),
            }),
            Script::AlwaysSearch => {
                let round = request.messages.iter().filter(|m| m.role == Role::Tool).count() + 1;
                let mut reply = search_call(&format!("call_{}", round), "more");
                reply.content = Some(format!("still researching ({})", round));
                Ok(reply)
            }
            Script::Fail | Script::PartialThenFail(_) => Err(LlmError::Api {
                status: 503,
                body: "upstream unavailable".into(),
            }),
        }
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChunkStream, LlmError> {
        if let Script::PartialThenFail(n) = self.script {
            self.record(request);
            let mut chunks: Vec<Result<StreamChunk, LlmError>> = (0..n)
                .map(|i| Ok(StreamChunk::TextDelta(format!("part{} ", i))))
                .collect();
            chunks.push(Err(LlmError::Stream("connection reset".into())));
            return Ok(Box::pin(futures::stream::iter(chunks)));
        }

        let response = self.chat_completion(request).await?;
        let mut chunks: Vec<Result<StreamChunk, LlmError>> = Vec::new();
        if let Some(text) = response.content {
            // Two deltas per answer to exercise incremental delivery.
            let mid = text.len() / 2;
            let (a, b) = text.split_at(mid);
            chunks.push(Ok(StreamChunk::TextDelta(a.to_string())));
            chunks.push(Ok(StreamChunk::TextDelta(b.to_string())));
        }
        chunks.extend(response.tool_calls.into_iter().map(|c| Ok(StreamChunk::ToolCall(c))));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[derive(Default)]
pub struct StubSearch {
    requests: Mutex<Vec<SearchRequest>>,
}

impl StubSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(SearchResponse {
            search_id: "search_1".into(),
            results: vec![SearchHit {
                url: "https://example.com".into(),
                title: Some("France".into()),
                excerpts: vec!["Paris is the capital.".into()],
            }],
        })
    }
}

pub struct StubBackends {
    pub llm: Arc<StubLlm>,
    pub search: Arc<StubSearch>,
}

impl Backends for StubBackends {
    fn completion(&self, _credentials: &Credentials) -> Arc<dyn LlmClient> {
        self.llm.clone()
    }

    fn search(&self, _credentials: &Credentials) -> Arc<dyn SearchProvider> {
        self.search.clone()
    }
}

pub fn configured(mode: ResearchMode) -> Config {
    let mut config = Config::new(Some("cerebras-test".into()), Some("parallel-test".into()));
    config.mode = mode;
    config
}

pub fn router(config: Config, llm: Arc<StubLlm>, search: Arc<StubSearch>) -> Router {
    build_router(Arc::new(AppState::new(
        config,
        Arc::new(StubBackends { llm, search }),
    )))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn research(app: &Router, body: &str) -> TestResponse {
    send(app, Method::POST, "/api/research", Some(body)).await
}

pub fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, OPTIONS"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}

/// The `data:` payloads of an SSE body, in order. Comments are skipped.
pub fn sse_data(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|frame| {
            frame
                .lines()
                .find_map(|line| line.strip_prefix("data:"))
                .map(|data| data.trim_start().to_string())
        })
        .collect()
}
