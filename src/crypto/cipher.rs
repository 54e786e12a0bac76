//! Symmetric encryption of stored token values.
//!
//! XChaCha20-Poly1305 with a random 24-byte nonce per call.
//! Stored format: `nonce (24 bytes) | ciphertext + tag`.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

use crate::config::EncryptionKey;
use crate::error::AppError;

const NONCE_LEN: usize = 24;
const AAD: &[u8] = b"pat-vault-token-v1";

/// Encrypts and decrypts token payloads under the process-wide key.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: XChaCha20Poly1305,
}

impl TokenCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, AppError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: AAD,
                },
            )
            .map_err(|_| AppError::Crypto("Token encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Fails with [`AppError::Decryption`] for anything not sealed by this key.
    pub fn decrypt(&self, data: &[u8]) -> Result<Zeroizing<String>, AppError> {
        if data.len() < NONCE_LEN {
            return Err(AppError::Decryption);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(
                    XNonce::from_slice(nonce),
                    Payload {
                        msg: ciphertext,
                        aad: AAD,
                    },
                )
                .map_err(|_| AppError::Decryption)?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|_| AppError::Decryption)?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(byte: u8) -> TokenCipher {
        TokenCipher::new(&EncryptionKey::new([byte; 32]))
    }

    #[test]
    fn test_round_trip() {
        let c = cipher(1);
        for value in ["", "a", "ghp_0123456789abcdefABCDEF", "ünïcødé token ✓"] {
            let sealed = c.encrypt(value).unwrap();
            assert_eq!(c.decrypt(&sealed).unwrap().as_str(), value);
        }
    }

    #[test]
    fn test_encryption_is_randomized() {
        let c = cipher(1);
        let a = c.encrypt("same value").unwrap();
        let b = c.encrypt("same value").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_is_decryption_error() {
        let sealed = cipher(1).encrypt("secret").unwrap();
        assert!(matches!(
            cipher(2).decrypt(&sealed),
            Err(AppError::Decryption)
        ));
    }

    #[test]
    fn test_tampering_detected() {
        let c = cipher(1);
        let mut sealed = c.encrypt("secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(c.decrypt(&sealed), Err(AppError::Decryption)));
        assert!(matches!(c.decrypt(&[0u8; 10]), Err(AppError::Decryption)));
    }
}
