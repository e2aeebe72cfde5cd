// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infra Aggregate
//!
//! An [`Infra`] is a tenant-owned infrastructure resource (cluster, registry,
//! database) whose provisioning is delegated to the external provisioner. The
//! aggregate owns an append-only log of [`Operation`](crate::domain::operation::Operation)
//! records, stored alongside it by the [`InfraRepository`](crate::domain::repository::InfraRepository).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity, status and encrypted last-applied configuration of an infra

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::crypto::PayloadCipher;
use crate::domain::kind::KindRegistry;
use crate::domain::operation::Operation;
use crate::domain::workspace_id::{UniqueName, WorkspaceId};

/// Provisioner input values, stored encrypted as `last_applied`.
pub type Values = serde_json::Map<String, serde_json::Value>;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Owning tenant of an infra.
    ProjectId
);
numeric_id!(
    /// Storage-assigned infra id. `InfraId(0)` marks an infra that has not been persisted yet.
    InfraId
);
numeric_id!(ClusterId);
numeric_id!(UserId);

// ============================================================================
// Kind
// ============================================================================

/// Cloud a kind is provisioned on; decides which integration credentials apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    Aws,
    Gcp,
    DigitalOcean,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Gcp => write!(f, "gcp"),
            CloudProvider::DigitalOcean => write!(f, "do"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid infra kind '{0}': must be non-empty lowercase alphanumeric")]
pub struct InvalidKind(pub String);

/// Infra kind, e.g. `eks` or `rds`.
///
/// Kinds are open-ended: anything lowercase alphanumeric is accepted so that
/// new kinds can be registered in the [`KindRegistry`] without touching this
/// type. Dashes are forbidden because the kind is the first segment of the
/// dash-delimited workspace identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfraKind(Cow<'static, str>);

impl InfraKind {
    pub const ECR: InfraKind = InfraKind(Cow::Borrowed("ecr"));
    pub const EKS: InfraKind = InfraKind(Cow::Borrowed("eks"));
    pub const GCR: InfraKind = InfraKind(Cow::Borrowed("gcr"));
    pub const GKE: InfraKind = InfraKind(Cow::Borrowed("gke"));
    pub const DOCR: InfraKind = InfraKind(Cow::Borrowed("docr"));
    pub const DOKS: InfraKind = InfraKind(Cow::Borrowed("doks"));
    pub const RDS: InfraKind = InfraKind(Cow::Borrowed("rds"));

    pub fn new(kind: impl Into<String>) -> Result<Self, InvalidKind> {
        let kind = kind.into();
        let valid = !kind.is_empty()
            && kind
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());

        if !valid {
            return Err(InvalidKind(kind));
        }

        Ok(Self(Cow::Owned(kind)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cloud the well-known kinds live on. Unknown kinds have no provider and
    /// therefore no integration credentials to check.
    pub fn cloud_provider(&self) -> Option<CloudProvider> {
        match self.as_str() {
            "ecr" | "eks" | "rds" => Some(CloudProvider::Aws),
            "gcr" | "gke" => Some(CloudProvider::Gcp),
            "docr" | "doks" => Some(CloudProvider::DigitalOcean),
            _ => None,
        }
    }
}

impl fmt::Display for InfraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for InfraKind {
    type Error = InvalidKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InfraKind> for String {
    fn from(kind: InfraKind) -> Self {
        kind.0.into_owned()
    }
}

impl FromStr for InfraKind {
    type Err = InvalidKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of an infra. Transitions live in
/// [`crate::domain::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraStatus {
    Creating,
    Created,
    ErrorCreating,
    Updating,
    ErrorUpdating,
    Deleting,
    Deleted,
    ErrorDeleting,
}

impl InfraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfraStatus::Creating => "creating",
            InfraStatus::Created => "created",
            InfraStatus::ErrorCreating => "error_creating",
            InfraStatus::Updating => "updating",
            InfraStatus::ErrorUpdating => "error_updating",
            InfraStatus::Deleting => "deleting",
            InfraStatus::Deleted => "deleted",
            InfraStatus::ErrorDeleting => "error_deleting",
        }
    }
}

impl fmt::Display for InfraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown infra status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for InfraStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creating" => Ok(InfraStatus::Creating),
            "created" => Ok(InfraStatus::Created),
            "error_creating" => Ok(InfraStatus::ErrorCreating),
            "updating" => Ok(InfraStatus::Updating),
            "error_updating" => Ok(InfraStatus::ErrorUpdating),
            "deleting" => Ok(InfraStatus::Deleting),
            "deleted" => Ok(InfraStatus::Deleted),
            "error_deleting" => Ok(InfraStatus::ErrorDeleting),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Infra {
    pub id: InfraId,
    pub project_id: ProjectId,
    pub kind: InfraKind,
    pub api_version: String,
    /// Only set on `api_version` >= v2
    pub source_link: String,
    pub source_version: String,
    /// Random hex suffix, assigned once at creation.
    pub(crate) suffix: String,
    pub status: InfraStatus,
    pub created_by_user_id: UserId,
    /// Set when this infra is scoped to an existing cluster (e.g. RDS inside EKS).
    pub parent_cluster_id: Option<ClusterId>,
    pub aws_integration_id: Option<u64>,
    pub gcp_integration_id: Option<u64>,
    /// Points at an OAuth integration.
    pub do_integration_id: Option<u64>,
    pub database_id: Option<u64>,
    /// Encrypted last-applied values. Empty until the first operation succeeds.
    pub last_applied: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Infra {
    /// New, not yet persisted infra in the initial `creating` status.
    pub fn new(project_id: ProjectId, kind: InfraKind, suffix: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: InfraId(0),
            project_id,
            kind,
            api_version: "v2".to_string(),
            source_link: String::new(),
            source_version: String::new(),
            suffix: suffix.into(),
            status: InfraStatus::Creating,
            created_by_user_id: created_by,
            parent_cluster_id: None,
            aws_integration_id: None,
            gcp_integration_id: None,
            do_integration_id: None,
            database_id: None,
            last_applied: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent_cluster(mut self, cluster_id: ClusterId) -> Self {
        self.parent_cluster_id = Some(cluster_id);
        self
    }

    pub fn with_source(mut self, link: impl Into<String>, version: impl Into<String>) -> Self {
        self.source_link = link.into();
        self.source_version = version.into();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.parent_cluster_id.is_some()
    }

    pub fn set_status(&mut self, status: InfraStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// `{kind}-{project_id}-{id}-{suffix}`
    pub fn unique_name(&self) -> String {
        UniqueName {
            kind: self.kind.clone(),
            project_id: self.project_id,
            infra_id: self.id,
            suffix: self.suffix.clone(),
        }
        .to_string()
    }

    /// `{kind}-{project_id}-{id}-{suffix}-{operation_uid}`
    pub fn workspace_id(&self, operation: &Operation) -> String {
        format!("{}-{}", self.unique_name(), operation.uid)
    }

    /// True when the token names this infra (same kind, project, id and suffix).
    pub fn matches(&self, workspace: &WorkspaceId) -> bool {
        workspace.name.kind == self.kind
            && workspace.name.project_id == self.project_id
            && workspace.name.infra_id == self.id
            && workspace.name.suffix == self.suffix
    }

    /// External view of this infra. Encrypted bytes never leave this method;
    /// the last-applied configuration is reduced to the handful of non-sensitive
    /// fields the kind's redactor exposes.
    pub fn to_public_summary(&self, cipher: &dyn PayloadCipher, kinds: &KindRegistry) -> InfraSummary {
        InfraSummary {
            id: self.id,
            project_id: self.project_id,
            kind: self.kind.clone(),
            api_version: self.api_version.clone(),
            source_link: self.source_link.clone(),
            source_version: self.source_version.clone(),
            status: self.status,
            parent_cluster_id: self.parent_cluster_id,
            aws_integration_id: self.aws_integration_id,
            gcp_integration_id: self.gcp_integration_id,
            do_integration_id: self.do_integration_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_applied: self.safely_get_last_applied(cipher, kinds),
        }
    }

    fn safely_get_last_applied(&self, cipher: &dyn PayloadCipher, kinds: &KindRegistry) -> BTreeMap<String, String> {
        let Some(redactor) = kinds.redactor(&self.kind) else {
            return BTreeMap::new();
        };

        if self.last_applied.is_empty() {
            return BTreeMap::new();
        }

        match cipher.open_values(&self.last_applied) {
            Ok(values) => redactor.redact(&values),
            Err(e) => {
                debug!(infra_id = %self.id, error = %e, "Could not open last applied values, returning empty summary");
                BTreeMap::new()
            }
        }
    }
}

/// Redacted, serializable view of an [`Infra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfraSummary {
    pub id: InfraId,
    pub project_id: ProjectId,
    pub kind: InfraKind,
    pub api_version: String,
    pub source_link: String,
    pub source_version: String,
    pub status: InfraStatus,
    pub parent_cluster_id: Option<ClusterId>,
    pub aws_integration_id: Option<u64>,
    pub gcp_integration_id: Option<u64>,
    pub do_integration_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_applied: BTreeMap<String, String>,
}
