// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provisioner Port
//!
//! The provisioner is the external service that actually reconciles cloud
//! resources. `apply` only enqueues work: progress and the final outcome are
//! reported out-of-band, keyed by the workspace id embedded in the request.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request/response contract of the provisioner, implemented by
//!   `crate::infrastructure::provisioner_client::ProvisionerClient`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::infra::{InfraId, InfraKind, ProjectId, Values};
use crate::domain::operation::{OperationType, OperationUid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub kind: InfraKind,
    pub values: Values,
    pub operation_kind: OperationType,
    pub workspace_id: String,
    pub operation_id: OperationUid,
}

/// Acknowledgement returned by the provisioner once work is enqueued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    #[serde(default)]
    pub operation_id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionerError {
    /// The request never produced an HTTP response.
    #[error("provisioner transport error: {0}")]
    Transport(String),

    #[error("provisioner returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provisioner response: {0}")]
    Decode(String),
}

impl ProvisionerError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ProvisionerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn apply(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
        request: &ApplyRequest,
    ) -> Result<OperationHandle, ProvisionerError>;
}
