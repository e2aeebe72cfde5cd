// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Encryption seam for `last_applied` payloads.
//!
//! The domain only needs opaque seal/open over bytes; the AES-GCM
//! implementation lives in `crate::infrastructure::encryption`.

use thiserror::Error;

use crate::domain::infra::Values;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Tampered ciphertext or key mismatch.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("payload is not a valid configuration object: {0}")]
    Serialization(String),
}

/// Symmetric cipher over byte payloads.
pub trait PayloadCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Serialize and encrypt provisioner values.
    fn seal_values(&self, values: &Values) -> Result<Vec<u8>, CryptoError> {
        let plaintext = serde_json::to_vec(values).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        self.encrypt(&plaintext)
    }

    /// Decrypt and parse provisioner values. Any JSON object is accepted so
    /// payloads written by older or newer kind schemas still open.
    fn open_values(&self, ciphertext: &[u8]) -> Result<Values, CryptoError> {
        let plaintext = self.decrypt(ciphertext)?;
        serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Serialization(e.to_string()))
    }
}
