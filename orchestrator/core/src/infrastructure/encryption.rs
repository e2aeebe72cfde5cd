// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AES-256-GCM Payload Encryption
//!
//! Implements [`PayloadCipher`] for `last_applied` payloads. Each ciphertext
//! is `nonce (12 bytes) || AES-GCM output`, with a fresh random nonce per call,
//! so encrypting the same values twice yields different bytes.
//!
//! Also home of [`random_token`], used for infra suffixes and operation uids.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::domain::crypto::{CryptoError, PayloadCipher};

/// AES-GCM nonce length in bytes
const NONCE_LENGTH: usize = 12;

/// AES-256 key length in bytes
pub const KEY_LENGTH: usize = 32;

#[derive(Clone)]
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Key given as standard base64, as it appears in the config file.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("key is not valid base64: {}", e)))?;
        Self::new(&key)
    }

    /// Fresh random key, base64-encoded.
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        STANDARD.encode(key)
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesGcmCipher { .. }")
    }
}

impl PayloadCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < NONCE_LENGTH {
            return Err(CryptoError::Decryption("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = ciphertext.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

/// `n_bytes` of OS randomness as lowercase hex (`2 * n_bytes` characters).
pub fn random_token(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::new(&[7u8; KEY_LENGTH]).unwrap()
    }

    #[test]
    fn test_encryption_roundtrip() {
        let cipher = cipher();
        let encrypted = cipher.encrypt(b"machine_type=t3.medium").unwrap();

        assert_ne!(encrypted, b"machine_type=t3.medium");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), b"machine_type=t3.medium");
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let encrypted = cipher().encrypt(b"secret").unwrap();
        let other = AesGcmCipher::new(&[8u8; KEY_LENGTH]).unwrap();

        assert!(matches!(other.decrypt(&encrypted), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher();
        let mut encrypted = cipher.encrypt(b"secret").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xff;

        assert!(matches!(cipher.decrypt(&encrypted), Err(CryptoError::Decryption(_))));
        assert!(matches!(cipher.decrypt(&[1, 2, 3]), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(AesGcmCipher::new(&[0u8; 16]), Err(CryptoError::InvalidKey(_))));
        assert!(AesGcmCipher::from_base64("not base64!").is_err());
        assert!(AesGcmCipher::from_base64(&AesGcmCipher::generate_key()).is_ok());
    }

    #[test]
    fn test_seal_and_open_values() {
        let cipher = cipher();
        let values = json!({"eks_name": "prod", "nested": {"a": [1, 2]}}).as_object().cloned().unwrap();

        let sealed = cipher.seal_values(&values).unwrap();
        assert_eq!(cipher.open_values(&sealed).unwrap(), values);
    }

    #[test]
    fn test_open_values_rejects_non_object() {
        let cipher = cipher();
        let sealed = cipher.encrypt(b"[1,2,3]").unwrap();

        assert!(matches!(cipher.open_values(&sealed), Err(CryptoError::Serialization(_))));
    }

    #[test]
    fn test_random_token() {
        let token = random_token(10);
        assert_eq!(token.len(), 20);
        assert!(token.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_ne!(random_token(10), token);
    }
}
