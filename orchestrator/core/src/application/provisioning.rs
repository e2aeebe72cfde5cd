// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Provisioning Use Cases
//!
//! Application service driving an infra through its lifecycle: it records one
//! operation per attempted action, hands the work to the external provisioner,
//! and folds the provisioner's callback back into the infra.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Create / update / delete / retry dispatch and reconciliation
//! - **Collaborators:**
//!   - Domain: Infra, Operation aggregates; lifecycle state machine; KindRegistry
//!   - Infrastructure: InfraRepository, ClusterRepository, Provisioner, CredentialValidator, EventBus
//!
//! # Dispatch flow
//!
//! 1. Load the infra (a missing infra is reported as `Forbidden`, never `NotFound`)
//! 2. Skip deleted infras without touching the provisioner
//! 3. Resolve the parent cluster and check credentials
//! 4. Ask the state machine whether the request may begin
//! 5. Resolve values (reuse the latest operation's when none are supplied)
//! 6. Run the kind's postrenderer
//! 7. Persist the encrypted operation and the in-flight status
//! 8. Call the provisioner, honoring cancellation and the deadline
//!
//! The operation stays `starting` after a successful dispatch until the
//! provisioner reports back through [`ProvisioningService::complete_operation`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::error::OrchestratorError;
use crate::application::infra_locks::InfraLocks;
use crate::application::rds_postrenderer::RdsPostrenderer;
use crate::domain::cluster::Cluster;
use crate::domain::credentials::{CredentialValidator, InfraCredentials};
use crate::domain::crypto::PayloadCipher;
use crate::domain::events::InfraEvent;
use crate::domain::infra::{ClusterId, Infra, InfraId, InfraKind, InfraStatus, InfraSummary, ProjectId, UserId, Values};
use crate::domain::kind::{KindRegistry, PostrenderContext};
use crate::domain::lifecycle::{LifecycleRequest, Transition};
use crate::domain::operation::{
    Operation, OperationMeta, OperationUid, OperationView, DEFAULT_OPERATION_UID_BYTES,
};
use crate::domain::provisioner::{ApplyRequest, OperationHandle, Provisioner, ProvisionerError};
use crate::domain::repository::{ClusterRepository, InfraRepository, RepositoryError};
use crate::domain::workspace_id::{IdentifierError, WorkspaceId};
use crate::infrastructure::credentials::IntegrationCredentialValidator;
use crate::infrastructure::encryption::random_token;
use crate::infrastructure::event_bus::EventBus;

/// Byte length of a freshly minted infra suffix.
pub const DEFAULT_SUFFIX_BYTES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningSettings {
    pub operation_uid_bytes: usize,
    pub suffix_bytes: usize,
    /// Serialize requests per infra. Off by default: concurrent requests for
    /// the same infra may both pass the state machine check.
    pub single_flight: bool,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            operation_uid_bytes: DEFAULT_OPERATION_UID_BYTES,
            suffix_bytes: DEFAULT_SUFFIX_BYTES,
            single_flight: false,
        }
    }
}

/// Well-known kinds plus the postrenderers shipped with the orchestrator.
pub fn default_kind_registry() -> KindRegistry {
    let mut kinds = KindRegistry::with_defaults();
    kinds.set_postrenderer(&InfraKind::RDS, Arc::new(RdsPostrenderer::new()));
    kinds
}

/// Lifecycle request against an existing infra.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub project_id: ProjectId,
    pub infra_id: InfraId,
    pub request: LifecycleRequest,
    /// `None` or an empty map reuses the latest operation's values.
    pub values: Option<Values>,
    pub credentials: InfraCredentials,
    pub cancel: CancellationToken,
    pub deadline: Option<Duration>,
}

impl OperationRequest {
    pub fn new(project_id: ProjectId, infra_id: InfraId, request: LifecycleRequest) -> Self {
        Self {
            project_id,
            infra_id,
            request,
            values: None,
            credentials: InfraCredentials::default(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_credentials(mut self, credentials: InfraCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateInfraRequest {
    pub project_id: ProjectId,
    pub kind: InfraKind,
    pub values: Values,
    pub created_by: UserId,
    pub parent_cluster_id: Option<ClusterId>,
    pub source_link: String,
    pub source_version: String,
    pub credentials: InfraCredentials,
    pub cancel: CancellationToken,
    pub deadline: Option<Duration>,
}

impl CreateInfraRequest {
    pub fn new(project_id: ProjectId, kind: InfraKind, created_by: UserId, values: Values) -> Self {
        Self {
            project_id,
            kind,
            values,
            created_by,
            parent_cluster_id: None,
            source_link: String::new(),
            source_version: String::new(),
            credentials: InfraCredentials::default(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn in_cluster(mut self, cluster_id: ClusterId) -> Self {
        self.parent_cluster_id = Some(cluster_id);
        self
    }

    pub fn with_source(mut self, link: impl Into<String>, version: impl Into<String>) -> Self {
        self.source_link = link.into();
        self.source_version = version.into();
        self
    }

    pub fn with_credentials(mut self, credentials: InfraCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// A new operation was recorded and accepted by the provisioner.
    Dispatched {
        operation: OperationMeta,
        workspace_id: String,
        handle: OperationHandle,
    },
    /// The infra is deleted; nothing was recorded or sent.
    Skipped { infra_id: InfraId, status: InfraStatus },
}

impl DispatchResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DispatchResult::Skipped { .. })
    }
}

/// Result of a create. `infra.last_applied` stays empty until the
/// provisioner reports the create operation as completed; the dispatched
/// values are on the operation until then.
#[derive(Debug, Clone)]
pub struct CreatedInfra {
    pub infra: InfraSummary,
    pub operation: OperationMeta,
    pub workspace_id: String,
    pub handle: OperationHandle,
}

/// Terminal result reported by the provisioner for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    Errored(String),
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, OperationOutcome::Completed)
    }
}

/// Provisioning use cases
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Persist a new infra with its `create` operation and dispatch it.
    ///
    /// # Errors
    ///
    /// - Rejected: unknown kind, empty values, or postrenderer refusal
    /// - Forbidden: parent cluster missing or credentials refused
    /// - Internal / Canceled / PassThrough: dispatch failures (the infra and
    ///   its errored operation are kept)
    async fn create_infra(&self, request: CreateInfraRequest) -> Result<CreatedInfra, OrchestratorError>;

    /// Run an update, delete or retry against an existing infra.
    async fn execute(&self, request: OperationRequest) -> Result<DispatchResult, OrchestratorError>;

    /// Record the provisioner's outcome for the operation named by a
    /// 5-segment workspace id. Resolving an already terminal operation returns
    /// it unchanged.
    async fn complete_operation(
        &self,
        workspace_id: &str,
        outcome: OperationOutcome,
    ) -> Result<OperationMeta, OrchestratorError>;

    async fn get_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<InfraSummary, OrchestratorError>;

    async fn list_infras(&self, project_id: ProjectId) -> Result<Vec<InfraSummary>, OrchestratorError>;

    /// Operation metas in insertion order.
    async fn list_operations(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
    ) -> Result<Vec<OperationMeta>, OrchestratorError>;

    async fn get_operation(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
        operation_uid: &str,
    ) -> Result<OperationView, OrchestratorError>;

    /// Fails `NotFound` when the infra has no operation yet.
    async fn latest_operation(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
    ) -> Result<OperationMeta, OrchestratorError>;
}

/// Standard implementation of ProvisioningService
pub struct StandardProvisioningService {
    infras: Arc<dyn InfraRepository>,
    clusters: Arc<dyn ClusterRepository>,
    provisioner: Arc<dyn Provisioner>,
    credentials: Arc<dyn CredentialValidator>,
    cipher: Arc<dyn PayloadCipher>,
    kinds: Arc<KindRegistry>,
    event_bus: Arc<EventBus>,
    settings: ProvisioningSettings,
    locks: InfraLocks,
}

enum DispatchFailure {
    Canceled,
    DeadlineExceeded(Duration),
    Provisioner(ProvisionerError),
}

impl StandardProvisioningService {
    /// Service with the default credential check, kind registry and settings.
    pub fn new(
        infras: Arc<dyn InfraRepository>,
        clusters: Arc<dyn ClusterRepository>,
        provisioner: Arc<dyn Provisioner>,
        cipher: Arc<dyn PayloadCipher>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            infras,
            clusters,
            provisioner,
            credentials: Arc::new(IntegrationCredentialValidator::new()),
            cipher,
            kinds: Arc::new(default_kind_registry()),
            event_bus,
            settings: ProvisioningSettings::default(),
            locks: InfraLocks::new(),
        }
    }

    pub fn with_credential_validator(mut self, credentials: Arc<dyn CredentialValidator>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_kinds(mut self, kinds: Arc<KindRegistry>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_settings(mut self, settings: ProvisioningSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> ProvisioningSettings {
        self.settings
    }

    async fn single_flight(&self, infra_id: InfraId) -> Option<OwnedMutexGuard<()>> {
        if !self.settings.single_flight {
            return None;
        }
        Some(self.locks.acquire(infra_id).await)
    }

    /// Infras outside the caller's project are indistinguishable from
    /// missing ones.
    async fn load_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<Infra, OrchestratorError> {
        self.infras.read_infra(project_id, infra_id).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => {
                OrchestratorError::Forbidden(format!("infra {infra_id} is not accessible in project {project_id}"))
            }
            other => OrchestratorError::Internal(other.to_string()),
        })
    }

    async fn resolve_cluster(&self, infra: &Infra) -> Result<Option<Cluster>, OrchestratorError> {
        let Some(cluster_id) = infra.parent_cluster_id else {
            return Ok(None);
        };

        match self.clusters.read_cluster(infra.project_id, cluster_id).await {
            Ok(cluster) => Ok(Some(cluster)),
            Err(RepositoryError::NotFound(_)) => Err(OrchestratorError::Forbidden(format!(
                "cluster {cluster_id} is not accessible in project {}",
                infra.project_id
            ))),
            Err(e) => Err(OrchestratorError::Internal(e.to_string())),
        }
    }

    async fn authorize(&self, infra: &Infra, credentials: &InfraCredentials) -> Result<(), OrchestratorError> {
        self.credentials
            .check_credentials(infra.project_id, infra, credentials)
            .await
            .map_err(|e| {
                debug!(infra_id = %infra.id, error = %e, "Credential check refused request");
                OrchestratorError::Forbidden(e.to_string())
            })
    }

    /// Values of the latest operation, decrypted. An infra in any
    /// non-initial status always has one.
    async fn last_applied_values(&self, infra: &Infra) -> Result<Values, OrchestratorError> {
        let latest = self.infras.get_latest_operation(infra).await.map_err(|e| {
            OrchestratorError::Internal(format!("no previous values for infra {}: {e}", infra.id))
        })?;

        Ok(self.cipher.open_values(&latest.last_applied)?)
    }

    async fn postrender(
        &self,
        infra: &Infra,
        cluster: Option<&Cluster>,
        values: Values,
    ) -> Result<Values, OrchestratorError> {
        let Some(postrenderer) = self.kinds.postrenderer_for(infra) else {
            return Ok(values);
        };

        postrenderer
            .run(PostrenderContext { infra, cluster }, values)
            .await
            .map_err(|e| OrchestratorError::Rejected(e.to_string()))
    }

    fn mint_operation_uid(&self) -> Result<OperationUid, OrchestratorError> {
        OperationUid::new(random_token(self.settings.operation_uid_bytes))
            .map_err(|e| OrchestratorError::Internal(e.to_string()))
    }

    fn skip(&self, infra: &Infra, request: LifecycleRequest) -> DispatchResult {
        debug!(infra_id = %infra.id, %request, status = %infra.status, "Infra is finalized, ignoring request");
        metrics::counter!("infra_dispatch_skipped_total", "kind" => infra.kind.to_string()).increment(1);
        self.event_bus.publish_infra_event(InfraEvent::DispatchSkipped {
            infra_id: infra.id,
            request,
            status: infra.status,
            skipped_at: Utc::now(),
        });

        DispatchResult::Skipped {
            infra_id: infra.id,
            status: infra.status,
        }
    }

    async fn call_provisioner(
        &self,
        infra: &Infra,
        request: &ApplyRequest,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OperationHandle, DispatchFailure> {
        let apply = async {
            let call = self.provisioner.apply(infra.project_id, infra.id, request);
            match deadline {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(DispatchFailure::Provisioner),
                    Err(_) => Err(DispatchFailure::DeadlineExceeded(limit)),
                },
                None => call.await.map_err(DispatchFailure::Provisioner),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchFailure::Canceled),
            result = apply => result,
        }
    }

    /// Record an operation that will never be dispatched as errored. A
    /// second storage failure here is only logged; the caller already
    /// returns the first one.
    async fn abandon(&self, mut operation: Operation, message: String) {
        warn!(operation_uid = %operation.uid, error = %message, "Abandoning undispatched operation");
        if let Err(e) = operation.fail(message.clone()) {
            warn!(operation_uid = %operation.uid, error = %e, "Operation already resolved");
            return;
        }
        if let Err(e) = self.infras.update_operation(&operation).await {
            warn!(operation_uid = %operation.uid, error = %e, "Failed to record abandoned operation");
            return;
        }
        self.event_bus.publish_infra_event(InfraEvent::OperationFailed {
            infra_id: operation.infra_id,
            operation_uid: operation.uid.clone(),
            error: message,
            failed_at: Utc::now(),
        });
    }

    /// Send a freshly persisted operation to the provisioner. On failure the
    /// operation is marked errored and the infra goes back to `restore`.
    async fn dispatch(
        &self,
        mut infra: Infra,
        mut operation: Operation,
        restore: InfraStatus,
        values: Values,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<(OperationMeta, String, OperationHandle), OrchestratorError> {
        let workspace_id = infra.workspace_id(&operation);
        let request = ApplyRequest {
            kind: infra.kind.clone(),
            values,
            operation_kind: operation.operation_type,
            workspace_id: workspace_id.clone(),
            operation_id: operation.uid.clone(),
        };

        let failure = match self.call_provisioner(&infra, &request, cancel, deadline).await {
            Ok(handle) => {
                info!(
                    infra_id = %infra.id,
                    operation_uid = %operation.uid,
                    operation_type = %operation.operation_type,
                    %workspace_id,
                    "Dispatched operation to provisioner"
                );
                metrics::counter!(
                    "infra_operations_dispatched_total",
                    "kind" => infra.kind.to_string(),
                    "type" => operation.operation_type.as_str()
                )
                .increment(1);
                self.event_bus.publish_infra_event(InfraEvent::OperationDispatched {
                    infra_id: infra.id,
                    operation_uid: operation.uid.clone(),
                    operation_type: operation.operation_type,
                    workspace_id: workspace_id.clone(),
                    status: infra.status,
                    dispatched_at: Utc::now(),
                });
                return Ok((operation.to_meta(), workspace_id, handle));
            }
            Err(failure) => failure,
        };

        let (message, reason, error) = match failure {
            DispatchFailure::Canceled => ("operation canceled".to_string(), "canceled", OrchestratorError::Canceled),
            DispatchFailure::DeadlineExceeded(limit) => {
                debug!(infra_id = %infra.id, ?limit, "Provisioner call exceeded deadline");
                ("operation canceled".to_string(), "deadline", OrchestratorError::Canceled)
            }
            DispatchFailure::Provisioner(e) => {
                let message = format!("dispatch failed: {e}");
                match e.upstream_status() {
                    Some(404) => (
                        message,
                        "not_found",
                        OrchestratorError::PassThrough {
                            status: 404,
                            message: e.to_string(),
                        },
                    ),
                    _ => (message.clone(), "provisioner", OrchestratorError::Internal(message)),
                }
            }
        };

        warn!(
            infra_id = %infra.id,
            operation_uid = %operation.uid,
            error = %message,
            "Provisioner dispatch failed, recording errored operation"
        );

        operation.fail(message.clone())?;
        self.infras.update_operation(&operation).await?;

        if infra.status != restore {
            infra.set_status(restore);
            self.infras.update_infra(&infra).await?;
        }

        metrics::counter!(
            "infra_operations_failed_total",
            "kind" => infra.kind.to_string(),
            "reason" => reason
        )
        .increment(1);
        self.event_bus.publish_infra_event(InfraEvent::OperationFailed {
            infra_id: infra.id,
            operation_uid: operation.uid.clone(),
            error: message,
            failed_at: Utc::now(),
        });

        Err(error)
    }
}

#[async_trait]
impl ProvisioningService for StandardProvisioningService {
    async fn create_infra(&self, request: CreateInfraRequest) -> Result<CreatedInfra, OrchestratorError> {
        if !self.kinds.is_registered(&request.kind) {
            return Err(OrchestratorError::Rejected(format!("unsupported infra kind '{}'", request.kind)));
        }
        if request.values.is_empty() {
            return Err(OrchestratorError::Rejected("values are required to create an infra".to_string()));
        }

        let suffix = random_token(self.settings.suffix_bytes);
        let mut infra = Infra::new(request.project_id, request.kind, suffix, request.created_by)
            .with_source(request.source_link, request.source_version);
        infra.parent_cluster_id = request.parent_cluster_id;
        infra.aws_integration_id = request.credentials.aws_integration_id;
        infra.gcp_integration_id = request.credentials.gcp_integration_id;
        infra.do_integration_id = request.credentials.do_integration_id;

        let cluster = self.resolve_cluster(&infra).await?;
        self.authorize(&infra, &request.credentials).await?;

        let Transition::Begin { operation_type, .. } = infra.status.begin(LifecycleRequest::Create)? else {
            return Err(OrchestratorError::Internal("new infra cannot be finalized".to_string()));
        };

        let values = self.postrender(&infra, cluster.as_ref(), request.values).await?;
        let sealed = self.cipher.seal_values(&values)?;
        let operation = Operation::new(self.mint_operation_uid()?, infra.id, operation_type, sealed);

        let (infra, operation) = self.infras.insert_with_operation(infra, operation).await?;

        info!(project_id = %infra.project_id, infra_id = %infra.id, kind = %infra.kind, "Created infra");
        self.event_bus.publish_infra_event(InfraEvent::InfraCreated {
            project_id: infra.project_id,
            infra_id: infra.id,
            kind: infra.kind.clone(),
            created_at: infra.created_at,
        });

        let summary = infra.to_public_summary(self.cipher.as_ref(), &self.kinds);
        // A create that never reached the provisioner must stay retryable.
        let (operation, workspace_id, handle) = self
            .dispatch(
                infra,
                operation,
                InfraStatus::ErrorCreating,
                values,
                &request.cancel,
                request.deadline,
            )
            .await?;

        Ok(CreatedInfra {
            infra: summary,
            operation,
            workspace_id,
            handle,
        })
    }

    async fn execute(&self, request: OperationRequest) -> Result<DispatchResult, OrchestratorError> {
        let _guard = self.single_flight(request.infra_id).await;

        let mut infra = self.load_infra(request.project_id, request.infra_id).await?;
        if infra.status.is_final() {
            return Ok(self.skip(&infra, request.request));
        }

        let cluster = self.resolve_cluster(&infra).await?;
        self.authorize(&infra, &request.credentials).await?;

        let (operation_type, from, to) = match infra.status.begin(request.request)? {
            Transition::Begin {
                operation_type,
                from,
                to,
            } => (operation_type, from, to),
            Transition::Ignore => return Ok(self.skip(&infra, request.request)),
        };

        let values = match request.values {
            Some(values) if !values.is_empty() => values,
            _ => self.last_applied_values(&infra).await?,
        };
        let values = self.postrender(&infra, cluster.as_ref(), values).await?;

        let sealed = self.cipher.seal_values(&values)?;
        let operation = self
            .infras
            .create_operation(Operation::new(self.mint_operation_uid()?, infra.id, operation_type, sealed))
            .await?;

        infra.set_status(to);
        if let Err(e) = self.infras.update_infra(&infra).await {
            self.abandon(operation, format!("status update failed: {e}")).await;
            return Err(e.into());
        }

        let (operation, workspace_id, handle) = self
            .dispatch(infra, operation, from, values, &request.cancel, request.deadline)
            .await?;

        Ok(DispatchResult::Dispatched {
            operation,
            workspace_id,
            handle,
        })
    }

    async fn complete_operation(
        &self,
        workspace_id: &str,
        outcome: OperationOutcome,
    ) -> Result<OperationMeta, OrchestratorError> {
        let token = WorkspaceId::parse_with_uid_bytes(workspace_id, self.settings.operation_uid_bytes)?;
        let _guard = self.single_flight(token.name.infra_id).await;

        let mut infra = self.load_infra(token.name.project_id, token.name.infra_id).await?;
        if !infra.matches(&token) {
            return Err(OrchestratorError::Forbidden(format!(
                "workspace id {workspace_id} does not name infra {}",
                infra.id
            )));
        }

        let mut operation = self.infras.read_operation(&infra, &token.operation_uid).await?;
        if operation.is_terminal() {
            debug!(operation_uid = %operation.uid, status = %operation.status, "Operation already resolved");
            return Ok(operation.to_meta());
        }

        // Older operations still get their own record resolved, but only the
        // latest one may move the infra.
        let latest = self.infras.get_latest_operation(&infra).await?;
        let next_status = if latest.uid == operation.uid {
            Some(infra.status.resolve(outcome.succeeded())?)
        } else {
            None
        };

        match &outcome {
            OperationOutcome::Completed => operation.complete()?,
            OperationOutcome::Errored(error) => operation.fail(error.clone())?,
        }
        self.infras.update_operation(&operation).await?;

        if let Some(status) = next_status {
            infra.set_status(status);
            if outcome.succeeded() {
                infra.last_applied = operation.last_applied.clone();
            }
            self.infras.update_infra(&infra).await?;
        }

        info!(
            infra_id = %infra.id,
            operation_uid = %operation.uid,
            succeeded = outcome.succeeded(),
            status = %infra.status,
            "Resolved operation"
        );
        metrics::counter!(
            "infra_operations_resolved_total",
            "kind" => infra.kind.to_string(),
            "outcome" => if outcome.succeeded() { "completed" } else { "errored" }
        )
        .increment(1);
        self.event_bus.publish_infra_event(InfraEvent::OperationResolved {
            infra_id: infra.id,
            operation_uid: operation.uid.clone(),
            succeeded: outcome.succeeded(),
            status: infra.status,
            resolved_at: Utc::now(),
        });

        Ok(operation.to_meta())
    }

    async fn get_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<InfraSummary, OrchestratorError> {
        let infra = self.load_infra(project_id, infra_id).await?;
        Ok(infra.to_public_summary(self.cipher.as_ref(), &self.kinds))
    }

    async fn list_infras(&self, project_id: ProjectId) -> Result<Vec<InfraSummary>, OrchestratorError> {
        let infras = self.infras.list_infras(project_id).await?;
        Ok(infras
            .iter()
            .map(|infra| infra.to_public_summary(self.cipher.as_ref(), &self.kinds))
            .collect())
    }

    async fn list_operations(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
    ) -> Result<Vec<OperationMeta>, OrchestratorError> {
        let infra = self.load_infra(project_id, infra_id).await?;
        let operations = self.infras.list_operations(&infra).await?;
        Ok(operations.iter().map(Operation::to_meta).collect())
    }

    async fn get_operation(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
        operation_uid: &str,
    ) -> Result<OperationView, OrchestratorError> {
        let uid = OperationUid::new(operation_uid)
            .map_err(|_| IdentifierError::InvalidOperationUid(operation_uid.to_string()))?;
        let infra = self.load_infra(project_id, infra_id).await?;
        let operation = self.infras.read_operation(&infra, &uid).await?;
        Ok(operation.to_view(self.cipher.as_ref())?)
    }

    async fn latest_operation(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
    ) -> Result<OperationMeta, OrchestratorError> {
        let infra = self.load_infra(project_id, infra_id).await?;
        let operation = self.infras.get_latest_operation(&infra).await?;
        Ok(operation.to_meta())
    }
}
