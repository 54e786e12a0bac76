use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::{extract::ApiJson, state::AppState};
use crate::auth::Subject;
use crate::error::AppError;
use crate::gateway::{
    AccessRequest, AccessResponse, DeleteResponse, SetupRequest, SetupResponse,
};
use crate::vault::TokenStatus;

/// POST /api/tokens/setup (requires auth)
pub async fn setup_token(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    ApiJson(req): ApiJson<SetupRequest>,
) -> Result<Json<SetupResponse>, AppError> {
    Ok(Json(state.gateway.setup_token(&subject, req).await?))
}

/// POST /api/tokens/access (requires auth)
pub async fn access_token(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    ApiJson(req): ApiJson<AccessRequest>,
) -> Result<Json<AccessResponse>, AppError> {
    Ok(Json(state.gateway.access_token(&subject, req).await?))
}

/// GET /api/tokens/status/:user_id (requires auth)
pub async fn token_status(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(user_id): Path<String>,
) -> Result<Json<TokenStatus>, AppError> {
    Ok(Json(state.gateway.token_status(&subject, &user_id).await?))
}

/// DELETE /api/tokens/:user_id (requires auth)
pub async fn delete_token(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    Ok(Json(state.gateway.delete_token(&subject, &user_id).await?))
}
