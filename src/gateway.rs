//! Access gateway: the request/response surface over auth and the vault.
//!
//! Every operation except `login` starts from a validated [`Subject`] and
//! checks that it owns the targeted `user_id` before touching the vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AuditLogger;
use crate::auth::{AuthService, Subject};
use crate::db::{GenerationMethod, User};
use crate::error::AppError;
use crate::vault::{TokenMetadata, TokenStatus, TokenVault};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub credential: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessRequest {
    pub user_id: String,
    pub application_name: String,
    pub purpose: String,
}

#[derive(Serialize, Deserialize)]
pub struct AccessResponse {
    pub token: String,
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    pub accessed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetupRequest {
    pub mode: GenerationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SetupResponse {
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    /// Shown once, for auto-generated tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Clone)]
pub struct AccessGateway {
    auth: AuthService,
    vault: TokenVault,
    audit: AuditLogger,
}

impl AccessGateway {
    pub fn new(auth: AuthService, vault: TokenVault) -> Self {
        Self {
            auth,
            vault,
            audit: AuditLogger::new(),
        }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let issued = self.auth.login(&req.username, &req.password).await?;

        Ok(LoginResponse {
            expires_in: issued.expires_in(),
            credential: issued.credential,
            token_type: "bearer".to_string(),
        })
    }

    /// First step of every protected operation.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<Subject, AppError> {
        let credential = credential.ok_or_else(|| {
            self.audit.credential_rejected("missing credential");
            AppError::Unauthorized("Missing bearer credential".to_string())
        })?;

        self.auth.validate(credential)
    }

    pub async fn access_token(
        &self,
        subject: &Subject,
        req: AccessRequest,
    ) -> Result<AccessResponse, AppError> {
        let user = self.authorize_owner(subject, &req.user_id, "access_token").await?;

        let retrieved = self
            .vault
            .get_token(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Token not found for this user".to_string()))?;

        self.audit
            .token_accessed(subject.username(), &req.application_name, &req.purpose);

        Ok(AccessResponse {
            token: retrieved.token.to_string(),
            metadata: retrieved.metadata,
            accessed_at: Utc::now(),
        })
    }

    pub async fn token_status(&self, subject: &Subject, user_id: &str) -> Result<TokenStatus, AppError> {
        let user = self.authorize_owner(subject, user_id, "token_status").await?;
        self.vault.get_status(user.id).await
    }

    pub async fn delete_token(&self, subject: &Subject, user_id: &str) -> Result<DeleteResponse, AppError> {
        let user = self.authorize_owner(subject, user_id, "delete_token").await?;

        if !self.vault.delete_token(user.id).await? {
            return Err(AppError::NotFound("Token not found".to_string()));
        }

        self.audit.token_deleted(subject.username());
        Ok(DeleteResponse { success: true })
    }

    /// Create or replace the caller's own token.
    pub async fn setup_token(&self, subject: &Subject, req: SetupRequest) -> Result<SetupResponse, AppError> {
        let user = self.auth.resolve(subject).await?;

        let stored = self
            .vault
            .create_or_replace_token(user.id, req.mode, req.token.as_deref())
            .await?;

        self.audit.token_stored(subject.username(), req.mode.as_str());

        Ok(SetupResponse {
            metadata: stored.metadata,
            token: stored.revealed.map(|value| value.to_string()),
        })
    }

    async fn authorize_owner(
        &self,
        subject: &Subject,
        user_id: &str,
        operation: &str,
    ) -> Result<User, AppError> {
        if subject.username() != user_id {
            self.audit
                .ownership_denied(subject.username(), user_id, operation);
            return Err(AppError::Forbidden("Access denied to this token".to_string()));
        }

        self.auth.resolve(subject).await
    }
}
