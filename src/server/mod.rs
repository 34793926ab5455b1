//! HTTP boundary for the extraction pipeline.
//!
//! Three routes: `POST /process` runs a batch through the pipeline and
//! returns records plus encoded downloads, `GET /download/{format}` serves
//! a stored batch as a file attachment, and `GET /health` reports liveness.

mod artifacts;
mod handlers;

pub use artifacts::ArtifactStore;
pub use handlers::{ApiError, EncodedData, ProcessRequest, ProcessResponse};

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::pipeline::Pipeline;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub artifacts: ArtifactStore,
}

impl AppState {
    pub fn new(pipeline: Pipeline, artifact_ttl: Duration) -> Self {
        Self {
            pipeline,
            artifacts: ArtifactStore::new(artifact_ttl),
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process", post(handlers::process))
        .route("/download/{format}", get(handlers::download))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("refsmith server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
