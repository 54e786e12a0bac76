use std::fmt;

use zeroize::Zeroizing;

use crate::error::AppError;

/// Minimum accepted length of the credential signing secret, in bytes.
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// 32-byte symmetric key used to encrypt stored tokens.
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; 32]>);

impl EncryptionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a standard base64 encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, AppError> {
        let bytes = Zeroizing::new(
            base64_simd::STANDARD
                .decode_to_vec(encoded.trim())
                .map_err(|e| AppError::Config(format!("ENCRYPTION_KEY is not base64: {}", e)))?,
        );

        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AppError::Config(format!(
                "ENCRYPTION_KEY must decode to 32 bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self::new(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// HMAC secret used to sign bearer credentials.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, AppError> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.len() < MIN_SIGNING_SECRET_LEN {
            return Err(AppError::Config(format!(
                "SIGNING_SECRET must be at least {} bytes",
                MIN_SIGNING_SECRET_LEN
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub encryption_key: EncryptionKey,
    pub signing_secret: SigningSecret,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is required", name)))
        };

        let encryption_key = EncryptionKey::from_base64(&required("ENCRYPTION_KEY")?)?;
        let signing_secret = SigningSecret::new(required("SIGNING_SECRET")?)?;
        let database_url = required("DATABASE_URL")?;

        let config = Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?,
            database_url,
            encryption_key,
            signing_secret,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid DB_MAX_CONNECTIONS: {}", e)))?,
            db_min_connections: lookup("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|| "1".to_string())
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid DB_MIN_CONNECTIONS: {}", e)))?,
            request_timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid REQUEST_TIMEOUT_SECS: {}", e)))?,
        };

        if config.db_min_connections > config.db_max_connections {
            return Err(AppError::Config(
                "DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid() -> HashMap<String, String> {
        let key = base64_simd::STANDARD.encode_to_string([7u8; 32]);
        let env = vars(&[
            ("ENCRYPTION_KEY", key.as_str()),
            ("SIGNING_SECRET", "0123456789abcdef0123456789abcdef"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]);
        env
    }

    #[test]
    fn test_defaults_applied() {
        let env = valid();
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.server_address(), "127.0.0.1:8000");
        assert_eq!(config.encryption_key.as_bytes(), &[7u8; 32]);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_required_values_fail() {
        for name in ["ENCRYPTION_KEY", "SIGNING_SECRET", "DATABASE_URL"] {
            let mut env = valid();
            env.remove(name);
            let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
            assert!(matches!(err, AppError::Config(ref msg) if msg.contains(name)));
        }
    }

    #[test]
    fn test_short_key_and_secret_rejected() {
        let mut env = valid();
        env.insert(
            "ENCRYPTION_KEY".into(),
            base64_simd::STANDARD.encode_to_string([1u8; 16]),
        );
        assert!(Config::from_lookup(|k| env.get(k).cloned()).is_err());

        let mut env = valid();
        env.insert("SIGNING_SECRET".into(), "short".into());
        assert!(Config::from_lookup(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let env = valid();
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        let rendered = format!("{:?}", config);

        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
