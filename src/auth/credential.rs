//! Self-contained bearer credentials.
//!
//! Wire format: `base64url(claims_json) "." base64url(HMAC-SHA256(secret, first_part))`.
//! Nothing is stored server side, so a credential stays valid until `exp`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::SigningSecret;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Fixed credential lifetime.
pub const CREDENTIAL_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub credential: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCredential {
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

#[derive(Clone)]
pub struct CredentialSigner {
    secret: SigningSecret,
}

impl CredentialSigner {
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    pub fn issue(&self, subject: &str) -> Result<IssuedCredential, AppError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedCredential, AppError> {
        let issued_at = truncate_to_secs(now)?;
        let expires_at = issued_at + Duration::hours(CREDENTIAL_LIFETIME_HOURS);

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| AppError::Internal(format!("Failed to encode claims: {}", e)))?;

        let payload = base64_simd::URL_SAFE_NO_PAD.encode_to_string(&json);
        let signature = base64_simd::URL_SAFE_NO_PAD.encode_to_string(self.sign(payload.as_bytes())?);

        Ok(IssuedCredential {
            credential: format!("{}.{}", payload, signature),
            issued_at,
            expires_at,
        })
    }

    pub fn validate(&self, credential: &str) -> Result<Claims, AppError> {
        self.validate_at(credential, Utc::now())
    }

    /// Check signature, shape and expiry, in that order.
    pub fn validate_at(&self, credential: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let (payload, signature) = credential
            .split_once('.')
            .ok_or_else(|| AppError::Unauthorized("Malformed credential".to_string()))?;

        let signature = base64_simd::URL_SAFE_NO_PAD
            .decode_to_vec(signature)
            .map_err(|_| AppError::Unauthorized("Malformed credential".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized("Invalid credential signature".to_string()))?;

        let json = base64_simd::URL_SAFE_NO_PAD
            .decode_to_vec(payload)
            .map_err(|_| AppError::Unauthorized("Malformed credential".to_string()))?;
        let claims: Claims = serde_json::from_slice(&json)
            .map_err(|_| AppError::Unauthorized("Malformed credential claims".to_string()))?;

        if claims.sub.is_empty() || claims.exp <= claims.iat {
            return Err(AppError::Unauthorized(
                "Malformed credential claims".to_string(),
            ));
        }
        if claims.exp <= now.timestamp() {
            return Err(AppError::Unauthorized("Credential expired".to_string()));
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::Crypto("Invalid signing secret".to_string()))
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn truncate_to_secs(now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_opt(now.timestamp(), 0)
        .single()
        .ok_or_else(|| AppError::Internal("Clock out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(secret: &str) -> CredentialSigner {
        CredentialSigner::new(SigningSecret::new(secret).unwrap())
    }

    const SECRET: &str = "test-signing-secret-with-32-bytes!!";

    #[test]
    fn test_issue_and_validate() {
        let s = signer(SECRET);
        let issued = s.issue("alice").unwrap();

        assert_eq!(issued.expires_in(), 24 * 3600);
        let claims = s.validate(&issued.credential).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_credential_rejected() {
        let s = signer(SECRET);
        let issued = s
            .issue_at("alice", Utc::now() - Duration::hours(25))
            .unwrap();

        let err = s.validate(&issued.credential).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m.contains("expired")));
    }

    #[test]
    fn test_expiry_boundary() {
        let s = signer(SECRET);
        let now = Utc::now();
        let issued = s.issue_at("alice", now).unwrap();

        let just_before = issued.expires_at - Duration::seconds(1);
        assert!(s.validate_at(&issued.credential, just_before).is_ok());
        assert!(s.validate_at(&issued.credential, issued.expires_at).is_err());
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let issued = signer(SECRET).issue("alice").unwrap();
        let other = signer("another-secret-that-is-32-bytes-long");

        assert!(matches!(
            other.validate(&issued.credential),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let s = signer(SECRET);
        let issued = s.issue("alice").unwrap();
        let (_, signature) = issued.credential.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: "bob".to_string(),
            iat: issued.issued_at.timestamp(),
            exp: issued.expires_at.timestamp(),
        };
        let forged_payload = base64_simd::URL_SAFE_NO_PAD
            .encode_to_string(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, signature);

        assert!(s.validate(&forged).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let s = signer(SECRET);
        for junk in ["", "abc", "a.b", "...", "not base64.!!!"] {
            assert!(matches!(s.validate(junk), Err(AppError::Unauthorized(_))));
        }
    }
}
