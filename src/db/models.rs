use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// How a stored token value came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMethod {
    #[serde(rename = "auto-generated")]
    AutoGenerated,
    #[serde(rename = "manual")]
    Manual,
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::AutoGenerated => "auto-generated",
            GenerationMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto-generated" => Ok(GenerationMethod::AutoGenerated),
            "manual" => Ok(GenerationMethod::Manual),
            other => Err(AppError::InvalidInput(format!(
                "Unknown generation method: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for GenerationMethod {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user's stored token. `encrypted_token` is ciphertext only.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub encrypted_token: Vec<u8>,
    #[sqlx(try_from = "String")]
    pub generation_method: GenerationMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
