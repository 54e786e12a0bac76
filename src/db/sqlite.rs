use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::db::models::{GenerationMethod, TokenRecord, User};
use crate::db::{map_unique_violation, TokenStore};
use crate::error::AppError;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32, min_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Each connection to a memory database gets its own empty database
        if is_memory_url(url) {
            tracing::warn!("⚠️  In-memory SQLite: data is lost on exit, pool limited to one connection");
            return Self::single_connection(options).await;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database on a single, never-recycled connection.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::single_connection(options).await
    }

    async fn single_connection(options: SqliteConnectOptions) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, AppError> {
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        tracing::debug!("SQLite migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let created_at = chrono::Utc::now();

        sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (username, password_hash, created_at)
VALUES (?, ?, ?)
RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username"))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_token_for_user(&self, user_id: i64) -> Result<Option<TokenRecord>, AppError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
SELECT id, user_id, encrypted_token, generation_method, created_at, updated_at
FROM tokens
WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn upsert_token(
        &self,
        user_id: i64,
        ciphertext: &[u8],
        method: GenerationMethod,
    ) -> Result<TokenRecord, AppError> {
        let now = chrono::Utc::now();

        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
INSERT INTO tokens (user_id, encrypted_token, generation_method, created_at, updated_at)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT (user_id) DO UPDATE SET
    encrypted_token = excluded.encrypted_token,
    generation_method = excluded.generation_method,
    updated_at = excluded.updated_at
RETURNING id, user_id, encrypted_token, generation_method, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(ciphertext)
        .bind(method.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_token(&self, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = SqliteStore::in_memory().await.unwrap();

        let user = store.create_user("alice", "hash").await.unwrap();
        let found = store.get_user_by_username("alice").await.unwrap().unwrap();

        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");
        assert!(store.get_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_user("alice", "hash").await.unwrap();

        let err = store.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_user() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = store.create_user("alice", "hash").await.unwrap();

        let first = store
            .upsert_token(user.id, b"first", GenerationMethod::AutoGenerated)
            .await
            .unwrap();
        let second = store
            .upsert_token(user.id, b"second", GenerationMethod::Manual)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.generation_method, GenerationMethod::Manual);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tokens WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let stored = store.get_token_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.encrypted_token, b"second".to_vec());
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = store.create_user("alice", "hash").await.unwrap();

        assert!(!store.delete_token(user.id).await.unwrap());
        store
            .upsert_token(user.id, b"x", GenerationMethod::Manual)
            .await
            .unwrap();
        assert!(store.delete_token(user.id).await.unwrap());
        assert!(store.get_token_for_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_url_shares_one_database() {
        let store = SqliteStore::connect("sqlite::memory:", 10, 1).await.unwrap();
        assert_eq!(store.pool().options().get_max_connections(), 1);

        let user = store.create_user("alice", "hash").await.unwrap();
        for _ in 0..5 {
            let found = store.get_user_by_username("alice").await.unwrap().unwrap();
            assert_eq!(found.id, user.id);
        }
    }

    #[test]
    fn test_is_memory_url() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:vault?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://vault.db"));
    }
}
