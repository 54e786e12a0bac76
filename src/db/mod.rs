//! Persistence gateway: typed access to the `users` and `tokens` tables.

pub mod models;
pub mod postgres;
pub mod sqlite;

pub use models::{GenerationMethod, TokenRecord, User};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;

/// Row-level operations the vault needs from the relational store.
///
/// Implementations hold no business logic and only ever see ciphertext.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a user. A taken username is [`AppError::InvalidInput`].
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn get_token_for_user(&self, user_id: i64) -> Result<Option<TokenRecord>, AppError>;

    /// Insert or overwrite the single token row of `user_id` in one statement.
    async fn upsert_token(
        &self,
        user_id: i64,
        ciphertext: &[u8],
        method: GenerationMethod,
    ) -> Result<TokenRecord, AppError>;

    /// Returns true if a row was removed.
    async fn delete_token(&self, user_id: i64) -> Result<bool, AppError>;
}

/// Open the store named by `config.database_url` and run its migrations.
pub async fn connect(config: &Config) -> Result<Arc<dyn TokenStore>, AppError> {
    let url = config.database_url.as_str();

    if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, config.db_max_connections, config.db_min_connections)
            .await?;
        Ok(Arc::new(store))
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store =
            PostgresStore::connect(url, config.db_max_connections, config.db_min_connections)
                .await?;
        Ok(Arc::new(store))
    } else {
        Err(AppError::Config(
            "DATABASE_URL must start with sqlite: or postgres://".to_string(),
        ))
    }
}

pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> AppError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::InvalidInput(format!("{} already exists", what))
        }
        other => AppError::StorageUnavailable(other),
    }
}
