use mpomeme::{
    config::Config, errors::AppError, routes::create_router, startup, storage::FileKeyValueStore,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mpomeme=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    tracing::info!(?config, "Configuration loaded");

    // --- Storage ---
    startup::init_data_dir(&config.data_dir).await?;
    let store = Arc::new(FileKeyValueStore::new(&config.data_dir));

    // --- Application State ---
    let state = Arc::new(AppState::new(store).await?);
    startup::report_collections(&state).await?;

    let app = create_router(state, config.max_upload_bytes);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .map_err(|e| AppError::InitError(format!("Failed to bind {}: {}", config.bind_address, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InitError(format!("Server error: {}", e)))?;

    Ok(())
}
