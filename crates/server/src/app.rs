use crate::chat::ChatService;
use crate::handlers;
use crate::session::SessionBackend;
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use pdfchat_core::config::Config;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub sessions: Arc<SessionBackend>,
    pub max_history: usize,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let chat = ChatService::new(config).await?;
        let sessions = SessionBackend::from_config(&config.session.with_env_overrides()).await?;
        Ok(Self {
            chat: Arc::new(chat),
            sessions: Arc::new(sessions),
            max_history: config.session.max_history,
        })
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/ask", post(handlers::ask))
        .route("/files", get(handlers::files))
        .route("/remove_file", post(handlers::remove_file))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
