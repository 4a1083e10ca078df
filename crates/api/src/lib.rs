//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for feedback, comments, and attachments
//! - WebSocket endpoints for chunked attachment upload and download
//! - Response types and error mapping

pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use critique_core::attachment::UploadLimits;
use critique_core::blobstore::BlobStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Blob store for feedback content and attachment payloads.
    pub blobs: BlobStore,
    /// Upload limits and budgets.
    pub upload_limits: UploadLimits,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
