use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// AES-256-GCM cipher for the stored email. A fresh random nonce is used per
/// encryption, so the same email never produces the same ciphertext; equality
/// lookups must go through [`hash_email`] instead.
#[derive(Clone)]
pub struct EmailCipher {
    key: [u8; KEY_SIZE],
}

impl EmailCipher {
    /// Build from a hex-encoded 32-byte key (the `ENCRYPTION_KEY` setting).
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let bytes = hex::decode(hex_key)
            .map_err(|_| AppError::Internal("ENCRYPTION_KEY is not valid hex".to_string()))?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            AppError::Internal(format!("ENCRYPTION_KEY must be {} bytes", KEY_SIZE))
        })?;
        Ok(Self { key })
    }

    /// Encrypt to hex(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to encrypt: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, data: &str) -> AppResult<String> {
        let data = hex::decode(data)
            .map_err(|_| AppError::Internal("Stored ciphertext is not valid hex".to_string()))?;
        if data.len() < NONCE_SIZE {
            return Err(AppError::Internal("Stored ciphertext is truncated".to_string()));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| AppError::Internal(format!("Failed to decrypt: {}", e)))?;

        String::from_utf8(plain)
            .map_err(|_| AppError::Internal("Decrypted email is not UTF-8".to_string()))
    }
}

/// Deterministic lookup digest of an email. Trims and lowercases first so
/// that casing/whitespace variants of the same address hash identically.
pub fn hash_email(email: &str) -> String {
    let normalized = email.trim().to_ascii_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> EmailCipher {
        EmailCipher::from_hex(&hex::encode([0x42u8; 32])).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("a@x.com").unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "a@x.com");
    }

    #[test]
    fn same_email_encrypts_differently() {
        let cipher = test_cipher();
        let first = cipher.encrypt("a@x.com").unwrap();
        let second = cipher.encrypt("a@x.com").unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), cipher.decrypt(&second).unwrap());
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(EmailCipher::from_hex("deadbeef").is_err());
        assert!(EmailCipher::from_hex("not hex at all").is_err());
    }

    #[test]
    fn hash_normalizes_case_and_whitespace() {
        assert_eq!(hash_email("A@X.com"), hash_email("  a@x.com "));
        assert_ne!(hash_email("a@x.com"), hash_email("b@x.com"));
    }
}
