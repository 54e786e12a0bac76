use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Hash a password with Argon2id and a fresh random salt.
///
/// Returns a PHC string; the salt and parameters travel inside it.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC digest.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(digest)
        .map_err(|e| AppError::Crypto(format!("Stored password hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Crypto(format!("Password verification failed: {}", e))),
    }
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_blocking(password: &str) -> Result<String, AppError> {
    let password = Zeroizing::new(password.to_string());

    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_blocking(password: &str, digest: &str) -> Result<bool, AppError> {
    let password = Zeroizing::new(password.to_string());
    let digest = digest.to_string();

    tokio::task::spawn_blocking(move || verify_password(&password, &digest))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify() {
        let password = "test_password_123";

        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("same"));
    }

    #[test]
    fn test_malformed_digest() {
        assert!(matches!(
            verify_password("pw", "not-a-phc-string"),
            Err(AppError::Crypto(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_helpers_on_single_threaded_runtime() {
        let hash = hash_password_blocking("off the worker").await.unwrap();

        assert!(verify_password_blocking("off the worker", &hash).await.unwrap());
        assert!(!verify_password_blocking("other", &hash).await.unwrap());
        assert!(matches!(
            verify_password_blocking("pw", "not-a-phc-string").await,
            Err(AppError::Crypto(_))
        ));
    }
}
