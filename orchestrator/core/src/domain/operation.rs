// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Operation Log Entries
//!
//! One [`Operation`] is recorded per attempted lifecycle action against an
//! infra. Operations are append-only: they are created when dispatched,
//! resolved exactly once, and never deleted. Retries create new operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::crypto::{CryptoError, PayloadCipher};
use crate::domain::infra::{InfraId, Values};

/// Byte length of a freshly minted operation uid (hex-encoded to twice this).
pub const DEFAULT_OPERATION_UID_BYTES: usize = 10;

/// Random lowercase-hex identifier of an operation, unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationUid(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation uid '{0}' is not lowercase hex")]
pub struct InvalidOperationUid(pub String);

impl OperationUid {
    pub fn new(uid: impl Into<String>) -> Result<Self, InvalidOperationUid> {
        let uid = uid.into();
        let valid = !uid.is_empty()
            && uid
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if !valid {
            return Err(InvalidOperationUid(uid));
        }

        Ok(Self(uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OperationUid {
    type Error = InvalidOperationUid;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OperationUid> for String {
    fn from(uid: OperationUid) -> Self {
        uid.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    RetryCreate,
    RetryDelete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::RetryCreate => "retry_create",
            OperationType::RetryDelete => "retry_delete",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation type '{0}'")]
pub struct UnknownOperationType(pub String);

impl FromStr for OperationType {
    type Err = UnknownOperationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationType::Create),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            "retry_create" => Ok(OperationType::RetryCreate),
            "retry_delete" => Ok(OperationType::RetryDelete),
            other => Err(UnknownOperationType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("operation {0} is already resolved")]
    AlreadyResolved(OperationUid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Storage row id; insertion order of the operation log. 0 until persisted.
    pub id: u64,
    pub uid: OperationUid,
    pub infra_id: InfraId,
    pub operation_type: OperationType,
    /// Free-form lifecycle label, see the `STATUS_*` constants.
    pub status: String,
    pub errored: bool,
    pub error: String,
    /// Encrypted values sent to the provisioner for this attempt.
    pub last_applied: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Operation {
    pub const STATUS_STARTING: &'static str = "starting";
    pub const STATUS_COMPLETED: &'static str = "completed";
    pub const STATUS_ERRORED: &'static str = "errored";

    pub fn new(uid: OperationUid, infra_id: InfraId, operation_type: OperationType, last_applied: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            uid,
            infra_id,
            operation_type,
            status: Self::STATUS_STARTING.to_string(),
            errored: false,
            error: String::new(),
            last_applied,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.errored || self.status != Self::STATUS_STARTING
    }

    pub fn complete(&mut self) -> Result<(), OperationError> {
        self.ensure_open()?;
        self.status = Self::STATUS_COMPLETED.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), OperationError> {
        self.ensure_open()?;
        self.status = Self::STATUS_ERRORED.to_string();
        self.errored = true;
        self.error = error.into();
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), OperationError> {
        if self.is_terminal() {
            return Err(OperationError::AlreadyResolved(self.uid.clone()));
        }
        Ok(())
    }

    pub fn to_meta(&self) -> OperationMeta {
        OperationMeta {
            last_updated: self.updated_at,
            uid: self.uid.clone(),
            infra_id: self.infra_id,
            operation_type: self.operation_type,
            status: self.status.clone(),
            errored: self.errored,
            error: self.error.clone(),
        }
    }

    /// Meta plus the decrypted values. Fails when the stored payload cannot be
    /// decrypted or is not a JSON object.
    pub fn to_view(&self, cipher: &dyn PayloadCipher) -> Result<OperationView, CryptoError> {
        Ok(OperationView {
            meta: self.to_meta(),
            last_applied: cipher.open_values(&self.last_applied)?,
        })
    }
}

/// Operation without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMeta {
    pub last_updated: DateTime<Utc>,
    pub uid: OperationUid,
    pub infra_id: InfraId,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub status: String,
    pub errored: bool,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationView {
    #[serde(flatten)]
    pub meta: OperationMeta,
    pub last_applied: Values,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> OperationUid {
        OperationUid::new("0123456789abcdef0123").unwrap()
    }

    #[test]
    fn test_uid_rejects_non_hex() {
        assert!(OperationUid::new("0123456789ABCDEF0123").is_err());
        assert!(OperationUid::new("xyz").is_err());
        assert!(OperationUid::new("").is_err());
    }

    #[test]
    fn test_operation_resolves_once() {
        let mut op = Operation::new(uid(), InfraId(1), OperationType::Create, vec![]);
        assert!(!op.is_terminal());

        op.fail("provisioner exploded").unwrap();
        assert!(op.errored);
        assert_eq!(op.status, Operation::STATUS_ERRORED);

        let before = op.clone();
        assert_eq!(op.complete(), Err(OperationError::AlreadyResolved(uid())));
        assert!(op.fail("again").is_err());
        assert_eq!(op.error, before.error);
        assert_eq!(op.status, before.status);
    }

    #[test]
    fn test_meta_serializes_type_field() {
        let op = Operation::new(uid(), InfraId(3), OperationType::RetryDelete, vec![1, 2, 3]);
        let json = serde_json::to_value(op.to_meta()).unwrap();

        assert_eq!(json["type"], "retry_delete");
        assert_eq!(json["status"], "starting");
        assert!(json.get("last_applied").is_none());
    }
}
