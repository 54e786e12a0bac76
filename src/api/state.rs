use std::sync::Arc;

use crate::auth::{AuthService, CredentialSigner};
use crate::config::Config;
use crate::crypto::TokenCipher;
use crate::db::TokenStore;
use crate::error::AppError;
use crate::gateway::AccessGateway;
use crate::vault::TokenVault;

#[derive(Clone)]
pub struct AppState {
    pub gateway: AccessGateway,
    pub config: Arc<Config>,
}

impl AppState {
    /// Composition root: key and secret are read from `config` here and nowhere else.
    pub fn new(config: Arc<Config>, store: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let cipher = TokenCipher::new(&config.encryption_key);
        let signer = CredentialSigner::new(config.signing_secret.clone());

        let auth = AuthService::new(store.clone(), signer)?;
        let vault = TokenVault::new(store, cipher);

        Ok(Self {
            gateway: AccessGateway::new(auth, vault),
            config,
        })
    }
}
