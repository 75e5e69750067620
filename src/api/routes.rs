//! HTTP routes: landing page, research endpoint, CORS and fallbacks.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use uuid::Uuid;

use super::state::AppState;
use super::types::{ErrorBody, ResearchPayload};
use crate::agent::{ResearchAgent, ResearchError, ResearchEvent, ResearchQuery};
use crate::config::ResearchMode;

const LANDING_PAGE: &str = include_str!("../../assets/index.html");

/// Capacity of the per-request event channel.
const EVENT_BUFFER: usize = 64;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing).fallback(not_found))
        .route("/api/research", post(research).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer CORS preflight for every path.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// `POST /api/research`
async fn research(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let credentials = match state.config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("Refusing research request: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let mode = state.config.mode;
    let payload: ResearchPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return research_failed(mode, format!("invalid request body: {}", e)),
    };

    let query = match ResearchQuery::new(
        payload.query.unwrap_or_default(),
        payload.system_prompt.as_deref(),
    ) {
        Ok(query) => query,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let agent = state.agent_for(&credentials);
    match mode {
        ResearchMode::Buffered => buffered(agent, query).await,
        ResearchMode::Streaming => streaming(agent, query),
    }
}

async fn buffered(agent: ResearchAgent, query: ResearchQuery) -> Response {
    match agent.research(&query).await {
        Ok(answer) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            answer.text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Research error: {}", e);
            research_failed(ResearchMode::Buffered, e.to_string())
        }
    }
}

fn streaming(agent: ResearchAgent, query: ResearchQuery) -> Response {
    let stream_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<ResearchEvent>(EVENT_BUFFER);

    let task = tokio::spawn(async move {
        let terminal = match agent.research_streaming(&query, &tx).await {
            Ok(answer) => ResearchEvent::Done {
                steps: answer.steps,
            },
            Err(ResearchError::StreamClosed) => {
                tracing::debug!(stream_id = %stream_id, "Client went away; research stopped");
                return;
            }
            Err(e) => {
                tracing::error!(stream_id = %stream_id, error = %e, "Research error");
                ResearchEvent::Error {
                    message: e.to_string(),
                }
            }
        };
        let _ = tx.send(terminal).await;
    });

    struct StreamDropGuard {
        stream_id: Uuid,
    }

    impl Drop for StreamDropGuard {
        fn drop(&mut self) {
            tracing::info!(stream_id = %self.stream_id, "Research SSE stream closed");
        }
    }

    tracing::info!(stream_id = %stream_id, "Research SSE stream opened");
    let drop_guard = StreamDropGuard { stream_id };

    let stream = async_stream::stream! {
        let _guard = drop_guard;
        let mut terminated = false;

        while let Some(ev) = rx.recv().await {
            terminated = ev.is_terminal();
            tracing::trace!(stream_id = %stream_id, event = ev.event_name(), "Research SSE event");
            match Event::default().json_data(&ev) {
                Ok(sse) => yield Ok::<Event, Infallible>(sse),
                Err(e) => {
                    tracing::error!(
                        stream_id = %stream_id,
                        event = ev.event_name(),
                        error = %e,
                        "Failed to serialize SSE event; dropping"
                    );
                }
            }
            if terminated {
                break;
            }
        }

        // The task ended without a terminal event: it panicked or was aborted.
        if !terminated {
            let message = match task.await {
                Err(e) if e.is_panic() => "research task panicked".to_string(),
                _ => "research ended unexpectedly".to_string(),
            };
            tracing::error!(stream_id = %stream_id, "{}", message);
            if let Ok(sse) = Event::default().json_data(ResearchEvent::Error { message }) {
                yield Ok(sse);
            }
        }

        yield Ok(Event::default().data("[DONE]"));
    };

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    );
    ([(header::CONNECTION, "keep-alive")], sse).into_response()
}

fn research_failed(mode: ResearchMode, message: String) -> Response {
    match mode {
        ResearchMode::Buffered => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Research failed: {}", message),
        )
            .into_response(),
        ResearchMode::Streaming => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: message }),
        )
            .into_response(),
    }
}
