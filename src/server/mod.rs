//! HTTP API
//!
//! Routes:
//! - `POST /merge`, `/split`, `/watermark`: PDF in, PDF out
//! - `POST /compress`: stores the result, answers with a download URL
//! - `GET /download/:id`: fetch a stored result
//! - `POST /word-to-pdf`, `/pdf-to-word`: office conversion
//! - `GET /health`

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::convert::{OfficeConverter, SofficeConverter};
use crate::error::Result;
use crate::storage::{ArtifactStore, DirectoryStore};

pub mod error;
pub mod form;
pub mod handlers;

pub use error::ServerError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ArtifactStore>,
    pub converter: Arc<dyn OfficeConverter>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ArtifactStore>, converter: Arc<dyn OfficeConverter>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            converter,
        }
    }

    /// Directory store and LibreOffice converter as configured
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = DirectoryStore::new(&config.storage.output_dir)?.with_ttl(config.storage.artifact_ttl());
        let converter = SofficeConverter::new(&config.converter.soffice);
        Ok(Self::new(config, Arc::new(store), Arc::new(converter)))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let server = &state.config.server;

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/merge", post(handlers::merge))
        .route("/split", post(handlers::split))
        .route("/watermark", post(handlers::watermark))
        .route("/compress", post(handlers::compress))
        .route("/download/:id", get(handlers::download))
        .route("/word-to-pdf", post(handlers::word_to_pdf))
        .route("/pdf-to-word", post(handlers::pdf_to_word))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    if server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// Bind the configured address and serve until the process stops
pub async fn serve(state: AppState) -> Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;

    info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
