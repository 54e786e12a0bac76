use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::error::AppError;

/// Authentication middleware - validates bearer credentials
///
/// Runs before any handler extractor, so a missing or bad credential is
/// reported ahead of ownership checks and body errors.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

            // Extract token from "Bearer <token>"
            let token = value
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;
            Some(token.trim().to_string())
        }
    };

    let subject = state.gateway.authenticate(credential.as_deref())?;

    // Store the subject in request extensions
    request.extensions_mut().insert(subject);

    Ok(next.run(request).await)
}
