// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Orchestrator Errors
//!
//! Single error type returned by the application services. Layer errors
//! (`RepositoryError`, `ProvisionerError`, `CryptoError`, ...) are mapped here
//! so callers only deal with the categories a transport layer needs: a status
//! code and whether the request may be resubmitted.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Boundary error taxonomy for lifecycle and deployment use cases

use thiserror::Error;

use crate::domain::crypto::CryptoError;
use crate::domain::lifecycle::TransitionError;
use crate::domain::operation::OperationError;
use crate::domain::repository::RepositoryError;
use crate::domain::workspace_id::IdentifierError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdentifierError),

    /// Postrenderer or request validation refused the values.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("operation canceled")]
    Canceled,

    /// Upstream status that is forwarded to the caller as-is.
    #[error("{message}")]
    PassThrough { status: u16, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::NotFound(_) => 404,
            OrchestratorError::Forbidden(_) => 403,
            OrchestratorError::MalformedIdentifier(_) | OrchestratorError::Rejected(_) => 400,
            OrchestratorError::InvalidTransition(_) => 409,
            OrchestratorError::Canceled => 408,
            OrchestratorError::PassThrough { status, .. } => *status,
            OrchestratorError::Internal(_) => 500,
        }
    }

    /// Only failures that leave state consistent and may succeed on resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::Internal(_) | OrchestratorError::Canceled)
    }
}

impl From<CryptoError> for OrchestratorError {
    fn from(err: CryptoError) -> Self {
        OrchestratorError::Internal(err.to_string())
    }
}

/// Storage failures are internal unless the record is simply missing. Call
/// sites that must hide existence (infra lookups) map `NotFound` themselves.
impl From<RepositoryError> for OrchestratorError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => OrchestratorError::NotFound(what),
            other => OrchestratorError::Internal(other.to_string()),
        }
    }
}

impl From<OperationError> for OrchestratorError {
    fn from(err: OperationError) -> Self {
        OrchestratorError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::InfraStatus;
    use crate::domain::lifecycle::LifecycleRequest;

    #[test]
    fn test_status_codes() {
        assert_eq!(OrchestratorError::NotFound("op".into()).status_code(), 404);
        assert_eq!(OrchestratorError::Forbidden("infra".into()).status_code(), 403);
        assert_eq!(OrchestratorError::Rejected("db_name".into()).status_code(), 400);
        assert_eq!(OrchestratorError::Canceled.status_code(), 408);
        assert_eq!(
            OrchestratorError::PassThrough {
                status: 404,
                message: "workflow file not found".into()
            }
            .status_code(),
            404
        );

        let transition = TransitionError::IllegalRequest {
            status: InfraStatus::Creating,
            request: LifecycleRequest::Update,
        };
        assert_eq!(OrchestratorError::from(transition).status_code(), 409);
    }

    #[test]
    fn test_only_internal_and_canceled_are_retryable() {
        assert!(OrchestratorError::Internal("boom".into()).is_retryable());
        assert!(OrchestratorError::Canceled.is_retryable());
        assert!(!OrchestratorError::Forbidden("x".into()).is_retryable());
        assert!(!OrchestratorError::PassThrough {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
        assert!(!OrchestratorError::MalformedIdentifier(IdentifierError::EmptySuffix).is_retryable());
    }

    #[test]
    fn test_decryption_surfaces_as_internal() {
        let err: OrchestratorError = CryptoError::Decryption("tag mismatch".into()).into();
        assert!(matches!(err, OrchestratorError::Internal(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_repository_errors() {
        let missing: OrchestratorError = RepositoryError::NotFound("operation".into()).into();
        assert!(matches!(missing, OrchestratorError::NotFound(_)));

        let conflict: OrchestratorError = RepositoryError::Conflict("uid".into()).into();
        assert!(matches!(conflict, OrchestratorError::Internal(_)));
        assert!(conflict.is_retryable());
    }
}
