//! Typed HTTP client for applications that consume tokens from a running vault.
//!
//! Error responses are mapped back onto [`AppError`] by their `kind`, so a
//! caller can match `AppError::Forbidden` or `AppError::NotFound` the same way
//! it would against an in-process [`AccessGateway`](crate::gateway::AccessGateway).

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::db::GenerationMethod;
use crate::error::AppError;
use crate::gateway::{
    AccessRequest, AccessResponse, DeleteResponse, LoginRequest, LoginResponse, SetupRequest,
    SetupResponse,
};
use crate::vault::TokenStatus;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: String,
}

/// Client for the vault HTTP API. Holds the bearer credential after `login`.
#[derive(Clone)]
pub struct VaultClient {
    base_url: String,
    http: Client,
    credential: Option<String>,
}

impl VaultClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credential: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Log in and keep the returned credential for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AppError> {
        debug!("Logging in to {} as {}", self.base_url, username);

        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let login: LoginResponse = parse(response).await?;
        self.credential = Some(login.credential);
        Ok(())
    }

    pub async fn setup_token(
        &self,
        mode: GenerationMethod,
        token: Option<&str>,
    ) -> Result<SetupResponse, AppError> {
        let response = self
            .http
            .post(self.url("/api/tokens/setup"))
            .bearer_auth(self.credential()?)
            .json(&SetupRequest {
                mode,
                token: token.map(str::to_string),
            })
            .send()
            .await?;

        parse(response).await
    }

    pub async fn get_token(
        &self,
        user_id: &str,
        application_name: &str,
        purpose: &str,
    ) -> Result<AccessResponse, AppError> {
        let response = self
            .http
            .post(self.url("/api/tokens/access"))
            .bearer_auth(self.credential()?)
            .json(&AccessRequest {
                user_id: user_id.to_string(),
                application_name: application_name.to_string(),
                purpose: purpose.to_string(),
            })
            .send()
            .await?;

        parse(response).await
    }

    pub async fn token_status(&self, user_id: &str) -> Result<TokenStatus, AppError> {
        let response = self
            .http
            .get(self.url(&format!("/api/tokens/status/{}", user_id)))
            .bearer_auth(self.credential()?)
            .send()
            .await?;

        parse(response).await
    }

    pub async fn delete_token(&self, user_id: &str) -> Result<DeleteResponse, AppError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/tokens/{}", user_id)))
            .bearer_auth(self.credential()?)
            .send()
            .await?;

        parse(response).await
    }

    /// True when the server answers its health route with 200.
    pub async fn health_check(&self) -> bool {
        match self.http.get(self.url("/api/health")).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    fn credential(&self) -> Result<&str, AppError> {
        self.credential
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Log in and fetch one token in a single call.
pub async fn get_token_for_application(
    api_url: &str,
    username: &str,
    password: &str,
    user_id: &str,
    application_name: &str,
    purpose: &str,
) -> Result<String, AppError> {
    let mut client = VaultClient::new(api_url)?;
    client.login(username, password).await?;

    let fetched = client.get_token(user_id, application_name, purpose).await?;
    Ok(fetched.token)
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
        error: status.to_string(),
        kind: String::new(),
    });

    Err(match body.kind.as_str() {
        "invalid_input" => AppError::InvalidInput(body.error),
        "authentication_error" => AppError::Authentication,
        "unauthorized" => AppError::Unauthorized(body.error),
        "forbidden" => AppError::Forbidden(body.error),
        "not_found" => AppError::NotFound(body.error),
        "decryption_error" => AppError::Decryption,
        _ => AppError::Remote(format!("{}: {}", status, body.error)),
    })
}
