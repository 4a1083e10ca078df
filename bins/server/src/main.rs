//! Critique API Server
//!
//! Main entry point for the Critique feedback backend.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use critique_api::{AppState, create_router};
use critique_core::attachment::UploadLimits;
use critique_core::blobstore::{BlobProvider, BlobStore};
use critique_db::connect;
use critique_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "critique=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // Build the blob store
    let provider = BlobProvider::from(config.storage.clone());
    let blobs = BlobStore::from_provider(&provider)?;
    info!(
        provider = blobs.provider_name(),
        bucket = blobs.bucket(),
        "Blob store configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        blobs,
        upload_limits: UploadLimits::from(&config.uploads),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
