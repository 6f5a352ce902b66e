use anyhow::Context;
use log::{info, warn};
use pdfchat_core::config::Config;
use server::{create_app, AppState};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SESSION_GC_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF chat server");

    let config = Config::load_from_env().unwrap_or_else(|e| {
        warn!("Could not load config ({}), using development defaults", e);
        Config::development()
    });

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize application state")?;
    state
        .sessions
        .clone()
        .spawn_gc(state.chat.clone(), SESSION_GC_INTERVAL);

    let server_cfg = config.server.with_env_overrides();
    let app = create_app(state, server_cfg.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&server_cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_cfg.bind_addr))?;
    info!("Server running on http://{}", server_cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
