use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pat_vault::{
    api::{create_router, AppState},
    config::Config,
    db,
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pat_vault=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting PAT vault v{}...", env!("CARGO_PKG_VERSION"));

    // Missing key, secret or store URL stops us here, before anything binds
    let config = Arc::new(Config::from_env().map_err(|e| {
        tracing::error!("❌ {}", e);
        e
    })?);
    tracing::info!("✅ Configuration loaded");

    let store = db::connect(&config).await?;
    tracing::info!("✅ Store connected and migrated");

    let state = AppState::new(config.clone(), store)?;
    let app = create_router(state);

    let addr = config.server_address();
    tracing::info!("🌐 Server listening on http://{}", addr);
    tracing::info!("🏥 Health check: http://{}/api/health", addr);
    tracing::info!("");
    tracing::info!("📚 API Endpoints:");
    tracing::info!("  POST   /api/auth/login              - Login, returns bearer credential");
    tracing::info!("  POST   /api/tokens/setup            - Create or replace own token (requires auth)");
    tracing::info!("  POST   /api/tokens/access           - Retrieve own token (requires auth)");
    tracing::info!("  GET    /api/tokens/status/:user_id  - Token status (requires auth)");
    tracing::info!("  DELETE /api/tokens/:user_id         - Delete token (requires auth)");
    tracing::info!("");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
