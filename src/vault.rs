//! Token vault: every token read and write passes through here.
//!
//! The store below only ever sees ciphertext. Plaintext leaves the vault
//! through [`TokenVault::get_token`] and, once, through the result of an
//! auto-generating [`TokenVault::create_or_replace_token`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::TokenCipher;
use crate::db::{GenerationMethod, TokenRecord, TokenStore};
use crate::error::AppError;

/// Entropy of auto-generated tokens, in bytes.
pub const GENERATED_TOKEN_BYTES: usize = 32;

/// Upper bound for manually supplied token values, in bytes.
pub const MAX_MANUAL_TOKEN_LEN: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub generation_method: GenerationMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TokenRecord> for TokenMetadata {
    fn from(record: &TokenRecord) -> Self {
        Self {
            generation_method: record.generation_method,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Result of a create-or-replace call.
pub struct StoredToken {
    pub metadata: TokenMetadata,
    /// The new value, present only for auto-generated tokens.
    pub revealed: Option<Zeroizing<String>>,
}

pub struct RetrievedToken {
    pub token: Zeroizing<String>,
    pub metadata: TokenMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_method: Option<GenerationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn TokenStore>,
    cipher: TokenCipher,
}

impl TokenVault {
    pub fn new(store: Arc<dyn TokenStore>, cipher: TokenCipher) -> Self {
        Self { store, cipher }
    }

    /// Store a new token for `user_id`, silently replacing any existing one.
    pub async fn create_or_replace_token(
        &self,
        user_id: i64,
        mode: GenerationMethod,
        manual_value: Option<&str>,
    ) -> Result<StoredToken, AppError> {
        let value = match mode {
            GenerationMethod::AutoGenerated => generate_token(),
            GenerationMethod::Manual => validate_manual_value(manual_value)?,
        };

        let ciphertext = self.cipher.encrypt(&value)?;
        let record = self.store.upsert_token(user_id, &ciphertext, mode).await?;

        tracing::info!(user_id, method = %mode, "Token stored");

        Ok(StoredToken {
            metadata: TokenMetadata::from(&record),
            revealed: match mode {
                GenerationMethod::AutoGenerated => Some(value),
                GenerationMethod::Manual => None,
            },
        })
    }

    /// Decrypt the stored token. `Ok(None)` means no token exists.
    pub async fn get_token(&self, user_id: i64) -> Result<Option<RetrievedToken>, AppError> {
        let Some(record) = self.store.get_token_for_user(user_id).await? else {
            return Ok(None);
        };

        let token = self.cipher.decrypt(&record.encrypted_token).map_err(|e| {
            tracing::error!(user_id, "❌ Stored token failed to decrypt with the current key");
            e
        })?;

        Ok(Some(RetrievedToken {
            token,
            metadata: TokenMetadata::from(&record),
        }))
    }

    pub async fn get_status(&self, user_id: i64) -> Result<TokenStatus, AppError> {
        let record = self.store.get_token_for_user(user_id).await?;

        Ok(match record {
            Some(record) => TokenStatus {
                exists: true,
                generation_method: Some(record.generation_method),
                created_at: Some(record.created_at),
                updated_at: Some(record.updated_at),
            },
            None => TokenStatus {
                exists: false,
                generation_method: None,
                created_at: None,
                updated_at: None,
            },
        })
    }

    pub async fn delete_token(&self, user_id: i64) -> Result<bool, AppError> {
        let removed = self.store.delete_token(user_id).await?;
        if removed {
            tracing::info!(user_id, "Token deleted");
        }
        Ok(removed)
    }
}

/// Random URL-safe token: 32 bytes from the OS RNG, base64url without padding.
pub fn generate_token() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; GENERATED_TOKEN_BYTES]);
    rand::rngs::OsRng.fill_bytes(&mut bytes[..]);
    Zeroizing::new(base64_simd::URL_SAFE_NO_PAD.encode_to_string(&bytes[..]))
}

fn validate_manual_value(value: Option<&str>) -> Result<Zeroizing<String>, AppError> {
    let value = value.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(AppError::InvalidInput(
            "A manual token value is required".to_string(),
        ));
    }
    if value.len() > MAX_MANUAL_TOKEN_LEN {
        return Err(AppError::InvalidInput(format!(
            "Token must be at most {} bytes",
            MAX_MANUAL_TOKEN_LEN
        )));
    }

    Ok(Zeroizing::new(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionKey;
    use crate::db::SqliteStore;

    async fn setup() -> (TokenVault, Arc<SqliteStore>, i64) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let user = store.create_user("alice", "hash").await.unwrap();
        let vault = TokenVault::new(
            store.clone(),
            TokenCipher::new(&EncryptionKey::new([9u8; 32])),
        );
        (vault, store, user.id)
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(*token, *generate_token());
    }

    #[tokio::test]
    async fn test_auto_generated_is_revealed_once_and_readable() {
        let (vault, _store, user_id) = setup().await;

        let stored = vault
            .create_or_replace_token(user_id, GenerationMethod::AutoGenerated, None)
            .await
            .unwrap();
        let revealed = stored.revealed.unwrap();
        assert_eq!(stored.metadata.generation_method, GenerationMethod::AutoGenerated);

        let fetched = vault.get_token(user_id).await.unwrap().unwrap();
        assert_eq!(*fetched.token, *revealed);
    }

    #[tokio::test]
    async fn test_manual_value_not_revealed_and_stored_encrypted() {
        let (vault, store, user_id) = setup().await;

        let stored = vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some("  ghp_manual  "))
            .await
            .unwrap();
        assert!(stored.revealed.is_none());

        let record = store.get_token_for_user(user_id).await.unwrap().unwrap();
        assert!(!record
            .encrypted_token
            .windows(b"ghp_manual".len())
            .any(|w| w == b"ghp_manual"));

        let fetched = vault.get_token(user_id).await.unwrap().unwrap();
        assert_eq!(fetched.token.as_str(), "ghp_manual");
    }

    #[tokio::test]
    async fn test_empty_manual_value_writes_nothing() {
        let (vault, _store, user_id) = setup().await;
        vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some("original"))
            .await
            .unwrap();

        for bad in [None, Some(""), Some("   ")] {
            let err = vault
                .create_or_replace_token(user_id, GenerationMethod::Manual, bad)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }

        let fetched = vault.get_token(user_id).await.unwrap().unwrap();
        assert_eq!(fetched.token.as_str(), "original");
    }

    #[tokio::test]
    async fn test_oversized_manual_value_rejected() {
        let (vault, _store, user_id) = setup().await;
        let huge = "x".repeat(MAX_MANUAL_TOKEN_LEN + 1);

        let err = vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some(huge.as_str()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!vault.get_status(user_id).await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_value() {
        let (vault, _store, user_id) = setup().await;

        let first = vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some("one"))
            .await
            .unwrap();
        let second = vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some("two"))
            .await
            .unwrap();

        assert_eq!(second.metadata.created_at, first.metadata.created_at);
        assert!(second.metadata.updated_at >= first.metadata.updated_at);
        let fetched = vault.get_token(user_id).await.unwrap().unwrap();
        assert_eq!(fetched.token.as_str(), "two");
    }

    #[tokio::test]
    async fn test_status_and_delete() {
        let (vault, _store, user_id) = setup().await;

        let status = vault.get_status(user_id).await.unwrap();
        assert!(!status.exists);
        assert!(status.generation_method.is_none());

        vault
            .create_or_replace_token(user_id, GenerationMethod::AutoGenerated, None)
            .await
            .unwrap();
        let status = vault.get_status(user_id).await.unwrap();
        assert!(status.exists);
        assert_eq!(status.generation_method, Some(GenerationMethod::AutoGenerated));

        assert!(vault.delete_token(user_id).await.unwrap());
        assert!(!vault.delete_token(user_id).await.unwrap());
        assert!(!vault.get_status(user_id).await.unwrap().exists);
        assert!(vault.get_token(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_change_is_decryption_error_not_missing() {
        let (vault, store, user_id) = setup().await;
        vault
            .create_or_replace_token(user_id, GenerationMethod::Manual, Some("sealed"))
            .await
            .unwrap();

        let rekeyed = TokenVault::new(store, TokenCipher::new(&EncryptionKey::new([3u8; 32])));
        assert!(matches!(
            rekeyed.get_token(user_id).await,
            Err(AppError::Decryption)
        ));
    }
}
