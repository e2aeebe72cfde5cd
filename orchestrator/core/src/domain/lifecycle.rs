// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infra Lifecycle State Machine
//!
//! ```text
//!             create / retry_create                 success
//!   (new) ──► creating ──────────────────────────────────────► created ◄──┐
//!                │ failure                                      │  │       │ success
//!                ▼                                       update │  │       │
//!          error_creating ──retry_create──► creating            ▼  │   updating
//!                                                        updating  │       │ failure
//!                                                                  │       ▼
//!                                                           delete │  error_updating
//!                                                                  ▼
//!                                 deleting ──success──► deleted (final, requests are no-ops)
//!                                    │ failure
//!                                    ▼
//!                              error_deleting ──retry_delete──► deleting
//! ```
//!
//! `delete` is also accepted from `error_creating` and `error_updating`.
//! A generic `retry` picks the retry that matches the current error status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::infra::InfraStatus;
use crate::domain::operation::OperationType;

/// Lifecycle action requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleRequest {
    Create,
    Update,
    Delete,
    RetryCreate,
    RetryDelete,
    /// Whichever retry matches the current error status.
    Retry,
}

impl std::fmt::Display for LifecycleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleRequest::Create => "create",
            LifecycleRequest::Update => "update",
            LifecycleRequest::Delete => "delete",
            LifecycleRequest::RetryCreate => "retry_create",
            LifecycleRequest::RetryDelete => "retry_delete",
            LifecycleRequest::Retry => "retry",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {request} an infra in status {status}")]
    IllegalRequest { status: InfraStatus, request: LifecycleRequest },

    #[error("infra in status {0} has no operation in flight")]
    NothingInFlight(InfraStatus),
}

/// Outcome of asking the state machine to begin a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Record a new operation of `operation_type` and move the infra `from` → `to`.
    Begin {
        operation_type: OperationType,
        from: InfraStatus,
        to: InfraStatus,
    },
    /// The infra is finalized; the request is ignored.
    Ignore,
}

impl InfraStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, InfraStatus::Deleted)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, InfraStatus::Creating | InfraStatus::Updating | InfraStatus::Deleting)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            InfraStatus::ErrorCreating | InfraStatus::ErrorUpdating | InfraStatus::ErrorDeleting
        )
    }

    /// Decide whether `request` may start from this status.
    pub fn begin(self, request: LifecycleRequest) -> Result<Transition, TransitionError> {
        use InfraStatus::*;
        use LifecycleRequest as R;

        if self.is_final() {
            return Ok(Transition::Ignore);
        }

        let request = match (request, self) {
            (R::Retry, ErrorCreating) => R::RetryCreate,
            (R::Retry, ErrorUpdating) => R::Update,
            (R::Retry, ErrorDeleting) => R::RetryDelete,
            (other, _) => other,
        };

        let (operation_type, to) = match (request, self) {
            (R::Create, Creating) => (OperationType::Create, Creating),
            (R::Update, Created | ErrorUpdating) => (OperationType::Update, Updating),
            (R::Delete, Created | ErrorCreating | ErrorUpdating) => (OperationType::Delete, Deleting),
            (R::RetryCreate, ErrorCreating) => (OperationType::RetryCreate, Creating),
            (R::RetryDelete, ErrorDeleting) => (OperationType::RetryDelete, Deleting),
            (request, status) => return Err(TransitionError::IllegalRequest { status, request }),
        };

        Ok(Transition::Begin {
            operation_type,
            from: self,
            to,
        })
    }

    /// Terminal status once the in-flight operation reports.
    pub fn resolve(self, succeeded: bool) -> Result<InfraStatus, TransitionError> {
        use InfraStatus::*;

        let next = match (self, succeeded) {
            (Creating, true) => Created,
            (Creating, false) => ErrorCreating,
            (Updating, true) => Created,
            (Updating, false) => ErrorUpdating,
            (Deleting, true) => Deleted,
            (Deleting, false) => ErrorDeleting,
            (status, _) => return Err(TransitionError::NothingInFlight(status)),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InfraStatus::*;

    fn begin_to(status: InfraStatus, request: LifecycleRequest) -> (OperationType, InfraStatus) {
        match status.begin(request).unwrap() {
            Transition::Begin { operation_type, to, .. } => (operation_type, to),
            Transition::Ignore => panic!("expected a transition from {status}"),
        }
    }

    #[test]
    fn test_legal_begins() {
        assert_eq!(begin_to(Creating, LifecycleRequest::Create), (OperationType::Create, Creating));
        assert_eq!(begin_to(Created, LifecycleRequest::Update), (OperationType::Update, Updating));
        assert_eq!(begin_to(ErrorUpdating, LifecycleRequest::Update), (OperationType::Update, Updating));
        assert_eq!(begin_to(Created, LifecycleRequest::Delete), (OperationType::Delete, Deleting));
        assert_eq!(begin_to(ErrorCreating, LifecycleRequest::Delete), (OperationType::Delete, Deleting));
        assert_eq!(
            begin_to(ErrorCreating, LifecycleRequest::RetryCreate),
            (OperationType::RetryCreate, Creating)
        );
        assert_eq!(
            begin_to(ErrorDeleting, LifecycleRequest::RetryDelete),
            (OperationType::RetryDelete, Deleting)
        );
    }

    #[test]
    fn test_generic_retry_follows_error_status() {
        assert_eq!(begin_to(ErrorCreating, LifecycleRequest::Retry), (OperationType::RetryCreate, Creating));
        assert_eq!(begin_to(ErrorUpdating, LifecycleRequest::Retry), (OperationType::Update, Updating));
        assert_eq!(begin_to(ErrorDeleting, LifecycleRequest::Retry), (OperationType::RetryDelete, Deleting));
        assert!(Created.begin(LifecycleRequest::Retry).is_err());
    }

    #[test]
    fn test_illegal_begins() {
        assert_eq!(
            Updating.begin(LifecycleRequest::Update),
            Err(TransitionError::IllegalRequest {
                status: Updating,
                request: LifecycleRequest::Update
            })
        );
        assert!(Created.begin(LifecycleRequest::Create).is_err());
        assert!(Created.begin(LifecycleRequest::RetryCreate).is_err());
        assert!(Deleting.begin(LifecycleRequest::Delete).is_err());
        assert!(ErrorDeleting.begin(LifecycleRequest::Update).is_err());
    }

    #[test]
    fn test_deleted_ignores_everything() {
        for request in [
            LifecycleRequest::Create,
            LifecycleRequest::Update,
            LifecycleRequest::Delete,
            LifecycleRequest::RetryCreate,
            LifecycleRequest::RetryDelete,
            LifecycleRequest::Retry,
        ] {
            assert_eq!(Deleted.begin(request), Ok(Transition::Ignore));
        }
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Creating.resolve(true), Ok(Created));
        assert_eq!(Creating.resolve(false), Ok(ErrorCreating));
        assert_eq!(Updating.resolve(true), Ok(Created));
        assert_eq!(Updating.resolve(false), Ok(ErrorUpdating));
        assert_eq!(Deleting.resolve(true), Ok(Deleted));
        assert_eq!(Deleting.resolve(false), Ok(ErrorDeleting));
        assert_eq!(Created.resolve(true), Err(TransitionError::NothingInFlight(Created)));
    }
}
