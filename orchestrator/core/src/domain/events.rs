// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::environment::DeploymentId;
use crate::domain::infra::{InfraId, InfraKind, InfraStatus, ProjectId};
use crate::domain::lifecycle::LifecycleRequest;
use crate::domain::operation::{OperationType, OperationUid};

/// Infra lifecycle events, published on the in-process event bus.
///
/// Events never carry configuration values, encrypted or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfraEvent {
    InfraCreated {
        project_id: ProjectId,
        infra_id: InfraId,
        kind: InfraKind,
        created_at: DateTime<Utc>,
    },
    OperationDispatched {
        infra_id: InfraId,
        operation_uid: OperationUid,
        operation_type: OperationType,
        workspace_id: String,
        status: InfraStatus,
        dispatched_at: DateTime<Utc>,
    },
    /// Request ignored because the infra is already finalized.
    DispatchSkipped {
        infra_id: InfraId,
        request: LifecycleRequest,
        status: InfraStatus,
        skipped_at: DateTime<Utc>,
    },
    /// Dispatch never reached the provisioner or was canceled.
    OperationFailed {
        infra_id: InfraId,
        operation_uid: OperationUid,
        error: String,
        failed_at: DateTime<Utc>,
    },
    /// Provisioner reported a terminal outcome.
    OperationResolved {
        infra_id: InfraId,
        operation_uid: OperationUid,
        succeeded: bool,
        status: InfraStatus,
        resolved_at: DateTime<Utc>,
    },
}

impl InfraEvent {
    pub fn infra_id(&self) -> InfraId {
        match self {
            InfraEvent::InfraCreated { infra_id, .. }
            | InfraEvent::OperationDispatched { infra_id, .. }
            | InfraEvent::DispatchSkipped { infra_id, .. }
            | InfraEvent::OperationFailed { infra_id, .. }
            | InfraEvent::OperationResolved { infra_id, .. } => *infra_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeploymentEvent {
    WorkflowDispatched {
        deployment_id: DeploymentId,
        workflow_file: String,
        git_ref: String,
        dispatched_at: DateTime<Utc>,
    },
    WorkflowSkipped {
        deployment_id: DeploymentId,
        skipped_at: DateTime<Utc>,
    },
}
