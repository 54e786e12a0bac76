use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::db::models::{GenerationMethod, TokenRecord, User};
use crate::db::{map_unique_violation, TokenStore};
use crate::error::AppError;

/// Client-server backend for production deployments.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    pub async fn connect(url: &str, max_connections: u32, min_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        tracing::debug!("Postgres migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (username, password_hash, created_at)
VALUES ($1, $2, $3)
RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username"))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
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
WHERE user_id = $1
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
VALUES ($1, $2, $3, $4, $4)
ON CONFLICT (user_id) DO UPDATE SET
    encrypted_token = EXCLUDED.encrypted_token,
    generation_method = EXCLUDED.generation_method,
    updated_at = EXCLUDED.updated_at
RETURNING id, user_id, encrypted_token, generation_method, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(ciphertext)
        .bind(method.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_token(&self, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
