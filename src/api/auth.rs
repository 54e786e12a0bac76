use axum::{extract::State, Json};

use crate::api::{extract::ApiJson, state::AppState};
use crate::error::AppError;
use crate::gateway::{LoginRequest, LoginResponse};

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state.gateway.login(req).await?;
    Ok(Json(response))
}
