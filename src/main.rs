//! Research Worker - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the research API.

use research_worker::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, mode={:?}, max_steps={}",
        config.model, config.mode, config.max_steps
    );
    if let Err(e) = config.credentials() {
        tracing::warn!("{}; research requests will fail until it is set", e);
    }

    api::serve(config).await?;

    Ok(())
}
