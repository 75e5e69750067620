//! HTTP API for the research worker.
//!
//! ## Endpoints
//!
//! - `GET /` - Landing page
//! - `POST /api/research` - Run a research query (plain text or SSE, per `RESEARCH_MODE`)
//! - `OPTIONS *` - CORS preflight

mod routes;
mod state;
pub mod types;

pub use routes::build_router;
pub use state::{AppState, Backends, HttpBackends};

use std::sync::Arc;

use crate::config::Config;

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let backends = Arc::new(HttpBackends::new(config.clone())?);
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(Arc::new(AppState::new(config, backends)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Research worker listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
