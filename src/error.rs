use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad username or password. The message never says which one.
    #[error("Invalid username or password")]
    Authentication,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Token could not be decrypted with the current key")]
    Decryption,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A remote vault could not be reached or answered unexpectedly.
    #[error("Remote vault error: {0}")]
    Remote(String),
}

impl AppError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Authentication => "authentication_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Decryption => "decryption_error",
            AppError::StorageUnavailable(_) => "storage_unavailable",
            AppError::Crypto(_) => "crypto_error",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
            AppError::Remote(_) => "remote_error",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Remote(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration failed: {}", err))
    }
}

// Axum IntoResponse implementation for HTTP errors
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let kind = self.kind();
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Authentication => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Decryption => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stored token could not be decrypted".to_string(),
            ),
            AppError::StorageUnavailable(err) => {
                tracing::error!("❌ Storage error: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage unavailable".to_string(),
                )
            }
            AppError::Remote(msg) => {
                tracing::error!("❌ {}: {}", kind, msg);
                (StatusCode::BAD_GATEWAY, "Upstream error".to_string())
            }
            AppError::Crypto(msg) | AppError::Config(msg) | AppError::Internal(msg) => {
                tracing::error!("❌ {}: {}", kind, msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "kind": kind,
        });

        (status, axum::Json(body)).into_response()
    }
}
