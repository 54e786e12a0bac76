pub mod credential;

pub use credential::{Claims, CredentialSigner, IssuedCredential, CREDENTIAL_LIFETIME_HOURS};

use std::fmt;
use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::crypto::{hash_password, hash_password_blocking, verify_password_blocking};
use crate::db::{TokenStore, User};
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Identity carried by a validated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(String);

impl Subject {
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Password login and credential validation.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TokenStore>,
    signer: CredentialSigner,
    audit: AuditLogger,
    // Verified against when the username is unknown, so both failure paths cost the same.
    decoy_hash: Arc<str>,
}

impl AuthService {
    pub fn new(store: Arc<dyn TokenStore>, signer: CredentialSigner) -> Result<Self, AppError> {
        let decoy_hash = hash_password("decoy-password-never-matches")?;
        Ok(Self {
            store,
            signer,
            audit: AuditLogger::new(),
            decoy_hash: decoy_hash.into(),
        })
    }

    /// Verify `username`/`password` and issue a 24h credential.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedCredential, AppError> {
        tracing::debug!(username, "Login received");

        let user = self.store.get_user_by_username(username).await?;

        let verified = match &user {
            Some(user) => verify_password_blocking(password, &user.password_hash)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(user_id = user.id, "❌ Password check failed: {}", e);
                    false
                }),
            None => {
                let _ = verify_password_blocking(password, &self.decoy_hash).await;
                false
            }
        };

        if !verified {
            self.audit.login_rejected(username);
            return Err(AppError::Authentication);
        }

        let issued = self.signer.issue(username)?;
        self.audit.login_issued(username);
        Ok(issued)
    }

    /// Pure computation: no storage access.
    pub fn validate(&self, credential: &str) -> Result<Subject, AppError> {
        let claims = self.signer.validate(credential).map_err(|e| {
            self.audit.credential_rejected(&e.to_string());
            e
        })?;
        Ok(Subject(claims.sub))
    }

    /// Resolve a validated subject to its user row.
    ///
    /// A credential for a user that no longer exists is `Unauthorized`.
    pub async fn resolve(&self, subject: &Subject) -> Result<User, AppError> {
        self.store
            .get_user_by_username(subject.username())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Credential subject no longer exists".to_string()))
    }

    /// Create a user account (provisioning).
    pub async fn provision_user(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = validate_username(username)?;

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let password_hash = hash_password_blocking(password).await?;
        let user = self.store.create_user(&username, &password_hash).await?;

        tracing::info!(user_id = user.id, username = %user.username, "User provisioned");
        Ok(user)
    }
}

/// Validate and sanitize username
pub fn validate_username(username: &str) -> Result<String, AppError> {
    let trimmed = username.trim();

    if trimmed.len() < 3 || trimmed.len() > 64 {
        return Err(AppError::InvalidInput(
            "Username must be 3-64 characters".to_string(),
        ));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits, '.', '_' or '-'".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}
