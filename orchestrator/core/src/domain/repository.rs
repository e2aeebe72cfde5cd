// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts, defined in the domain layer and implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `InfraRepository` | `Infra` + its `Operation` log | `InMemoryInfraRepository`, `PostgresInfraRepository` |
//! | `ClusterRepository` | `Cluster` | `InMemoryClusterRepository`, `PostgresClusterRepository` |
//! | `EnvironmentRepository` | `Environment`, `Deployment` | `InMemoryEnvironmentRepository`, `PostgresEnvironmentRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at startup from the `storage`
//! section of the orchestrator config. In-memory implementations are used for
//! development and testing; PostgreSQL implementations for production.

use async_trait::async_trait;

use crate::domain::cluster::Cluster;
use crate::domain::environment::{Deployment, DeploymentId, Environment, EnvironmentId};
use crate::domain::infra::{ClusterId, Infra, InfraId, ProjectId};
use crate::domain::operation::{Operation, OperationUid};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Repository for the Infra aggregate and its append-only operation log.
///
/// Operations are only ever inserted or resolved, never deleted.
#[async_trait]
pub trait InfraRepository: Send + Sync {
    /// Fails `NotFound` when the infra does not exist in `project_id`.
    async fn read_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<Infra, RepositoryError>;

    async fn list_infras(&self, project_id: ProjectId) -> Result<Vec<Infra>, RepositoryError>;

    /// Persist a new infra together with its first operation in one
    /// transaction. Assigns and returns both storage ids.
    async fn insert_with_operation(
        &self,
        infra: Infra,
        operation: Operation,
    ) -> Result<(Infra, Operation), RepositoryError>;

    async fn update_infra(&self, infra: &Infra) -> Result<(), RepositoryError>;

    /// Most recently created operation; fails `NotFound` when the infra has none.
    async fn get_latest_operation(&self, infra: &Infra) -> Result<Operation, RepositoryError>;

    /// Operations in insertion order.
    async fn list_operations(&self, infra: &Infra) -> Result<Vec<Operation>, RepositoryError>;

    async fn read_operation(&self, infra: &Infra, uid: &OperationUid) -> Result<Operation, RepositoryError>;

    /// Append an operation; fails `Conflict` when the uid is already taken.
    async fn create_operation(&self, operation: Operation) -> Result<Operation, RepositoryError>;

    async fn update_operation(&self, operation: &Operation) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn read_cluster(&self, project_id: ProjectId, cluster_id: ClusterId) -> Result<Cluster, RepositoryError>;
}

#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    /// Deployment scoped to the environment's project and cluster.
    async fn read_deployment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        deployment_id: DeploymentId,
    ) -> Result<Deployment, RepositoryError>;

    async fn read_environment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        environment_id: EnvironmentId,
    ) -> Result<Environment, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepositoryError::Conflict(db.to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
