pub mod auth;
pub mod extract;
pub mod middleware;
pub mod state;
pub mod tokens;

pub use extract::ApiJson;
pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    // Every route here requires a bearer credential
    let protected = Router::new()
        .route("/api/tokens/setup", post(tokens::setup_token))
        .route("/api/tokens/access", post(tokens::access_token))
        .route("/api/tokens/status/:user_id", get(tokens::token_status))
        .route("/api/tokens/:user_id", delete(tokens::delete_token))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Authentication endpoints
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
