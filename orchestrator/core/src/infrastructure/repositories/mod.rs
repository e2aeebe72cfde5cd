// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve infras, their operation logs and the
//!   collaborator records the orchestrator reads
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresInfraRepository** - Infras and operations, schema in `migrations/`
//! - **PostgresClusterRepository** - Cluster lookups for cluster-scoped infras
//! - **PostgresEnvironmentRepository** - Environments and deployments
//!
//! ## In-Memory Repositories
//!
//! Lock-protected maps for tests and development:
//! - **InMemoryInfraRepository**
//! - **InMemoryClusterRepository**
//! - **InMemoryEnvironmentRepository**

pub mod postgres_cluster;
pub mod postgres_environment;
pub mod postgres_infra;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::cluster::Cluster;
use crate::domain::environment::{Deployment, DeploymentId, Environment, EnvironmentId};
use crate::domain::infra::{ClusterId, Infra, InfraId, ProjectId};
use crate::domain::operation::{Operation, OperationUid};
use crate::domain::repository::{ClusterRepository, EnvironmentRepository, InfraRepository, RepositoryError};

pub use postgres_cluster::PostgresClusterRepository;
pub use postgres_environment::PostgresEnvironmentRepository;
pub use postgres_infra::PostgresInfraRepository;

#[derive(Default)]
struct InfraStore {
    infras: HashMap<InfraId, Infra>,
    /// All operations of all infras, in insertion order.
    operations: Vec<Operation>,
    last_infra_id: u64,
    last_operation_id: u64,
}

impl InfraStore {
    fn next_infra_id(&mut self) -> InfraId {
        self.last_infra_id += 1;
        InfraId(self.last_infra_id)
    }

    fn append_operation(&mut self, mut operation: Operation) -> Result<Operation, RepositoryError> {
        if self.operations.iter().any(|op| op.uid == operation.uid) {
            return Err(RepositoryError::Conflict(format!("operation uid {} already exists", operation.uid)));
        }

        self.last_operation_id += 1;
        operation.id = self.last_operation_id;
        self.operations.push(operation.clone());
        Ok(operation)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryInfraRepository {
    store: Arc<RwLock<InfraStore>>,
}

impl InMemoryInfraRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an infra without any operation, assigning its id. Meant for
    /// fixtures and imports; regular creation goes through `insert_with_operation`.
    pub fn insert_infra(&self, mut infra: Infra) -> Infra {
        let mut store = self.store.write();
        infra.id = store.next_infra_id();
        store.infras.insert(infra.id, infra.clone());
        infra
    }
}

fn infra_not_found(project_id: ProjectId, infra_id: InfraId) -> RepositoryError {
    RepositoryError::NotFound(format!("infra {} in project {}", infra_id, project_id))
}

#[async_trait]
impl InfraRepository for InMemoryInfraRepository {
    async fn read_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<Infra, RepositoryError> {
        let store = self.store.read();
        store
            .infras
            .get(&infra_id)
            .filter(|infra| infra.project_id == project_id)
            .cloned()
            .ok_or_else(|| infra_not_found(project_id, infra_id))
    }

    async fn list_infras(&self, project_id: ProjectId) -> Result<Vec<Infra>, RepositoryError> {
        let store = self.store.read();
        let mut infras: Vec<Infra> = store
            .infras
            .values()
            .filter(|infra| infra.project_id == project_id)
            .cloned()
            .collect();
        infras.sort_by_key(|infra| infra.id);
        Ok(infras)
    }

    async fn insert_with_operation(
        &self,
        mut infra: Infra,
        mut operation: Operation,
    ) -> Result<(Infra, Operation), RepositoryError> {
        let mut store = self.store.write();

        // Check before assigning ids so a conflict leaves no trace.
        if store.operations.iter().any(|op| op.uid == operation.uid) {
            return Err(RepositoryError::Conflict(format!("operation uid {} already exists", operation.uid)));
        }

        infra.id = store.next_infra_id();
        operation.infra_id = infra.id;
        let operation = store.append_operation(operation)?;
        store.infras.insert(infra.id, infra.clone());

        Ok((infra, operation))
    }

    async fn update_infra(&self, infra: &Infra) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        match store.infras.get_mut(&infra.id) {
            Some(existing) if existing.project_id == infra.project_id => {
                *existing = infra.clone();
                Ok(())
            }
            _ => Err(infra_not_found(infra.project_id, infra.id)),
        }
    }

    async fn get_latest_operation(&self, infra: &Infra) -> Result<Operation, RepositoryError> {
        let store = self.store.read();
        store
            .operations
            .iter()
            .rev()
            .find(|op| op.infra_id == infra.id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("no operations for infra {}", infra.id)))
    }

    async fn list_operations(&self, infra: &Infra) -> Result<Vec<Operation>, RepositoryError> {
        let store = self.store.read();
        Ok(store
            .operations
            .iter()
            .filter(|op| op.infra_id == infra.id)
            .cloned()
            .collect())
    }

    async fn read_operation(&self, infra: &Infra, uid: &OperationUid) -> Result<Operation, RepositoryError> {
        let store = self.store.read();
        store
            .operations
            .iter()
            .find(|op| op.infra_id == infra.id && &op.uid == uid)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("operation {} for infra {}", uid, infra.id)))
    }

    async fn create_operation(&self, operation: Operation) -> Result<Operation, RepositoryError> {
        let mut store = self.store.write();

        if !store.infras.contains_key(&operation.infra_id) {
            return Err(RepositoryError::NotFound(format!("infra {}", operation.infra_id)));
        }

        store.append_operation(operation)
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        let existing = store
            .operations
            .iter_mut()
            .find(|op| op.uid == operation.uid && op.infra_id == operation.infra_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("operation {}", operation.uid)))?;

        *existing = Operation {
            id: existing.id,
            ..operation.clone()
        };
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryClusterRepository {
    clusters: Arc<RwLock<HashMap<ClusterId, Cluster>>>,
}

impl InMemoryClusterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, cluster: Cluster) {
        self.clusters.write().insert(cluster.id, cluster);
    }
}

#[async_trait]
impl ClusterRepository for InMemoryClusterRepository {
    async fn read_cluster(&self, project_id: ProjectId, cluster_id: ClusterId) -> Result<Cluster, RepositoryError> {
        self.clusters
            .read()
            .get(&cluster_id)
            .filter(|cluster| cluster.project_id == project_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("cluster {} in project {}", cluster_id, project_id)))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEnvironmentRepository {
    environments: Arc<RwLock<HashMap<EnvironmentId, Environment>>>,
    deployments: Arc<RwLock<HashMap<DeploymentId, Deployment>>>,
}

impl InMemoryEnvironmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_environment(&self, environment: Environment) {
        self.environments.write().insert(environment.id, environment);
    }

    pub fn insert_deployment(&self, deployment: Deployment) {
        self.deployments.write().insert(deployment.id, deployment);
    }

    fn scoped_environment(&self, project_id: ProjectId, cluster_id: ClusterId, id: EnvironmentId) -> Option<Environment> {
        self.environments
            .read()
            .get(&id)
            .filter(|env| env.project_id == project_id && env.cluster_id == cluster_id)
            .cloned()
    }
}

#[async_trait]
impl EnvironmentRepository for InMemoryEnvironmentRepository {
    async fn read_deployment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        deployment_id: DeploymentId,
    ) -> Result<Deployment, RepositoryError> {
        let deployment = self
            .deployments
            .read()
            .get(&deployment_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("deployment {}", deployment_id)))?;

        if self
            .scoped_environment(project_id, cluster_id, deployment.environment_id)
            .is_none()
        {
            return Err(RepositoryError::NotFound(format!(
                "deployment {} in project {} cluster {}",
                deployment_id, project_id, cluster_id
            )));
        }

        Ok(deployment)
    }

    async fn read_environment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        environment_id: EnvironmentId,
    ) -> Result<Environment, RepositoryError> {
        self.scoped_environment(project_id, cluster_id, environment_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("environment {}", environment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::{InfraKind, UserId};
    use crate::domain::operation::OperationType;

    fn uid(n: u8) -> OperationUid {
        OperationUid::new(format!("{:020x}", n)).unwrap()
    }

    fn infra() -> Infra {
        Infra::new(ProjectId(4), InfraKind::EKS, "ab12cd", UserId(1))
    }

    #[tokio::test]
    async fn test_latest_operation_not_found_then_found() {
        let repo = InMemoryInfraRepository::new();
        let infra = repo.insert_infra(infra());

        let err = repo.get_latest_operation(&infra).await.unwrap_err();
        assert!(err.is_not_found());

        let created = repo
            .create_operation(Operation::new(uid(1), infra.id, OperationType::Create, vec![1]))
            .await
            .unwrap();

        let latest = repo.get_latest_operation(&infra).await.unwrap();
        assert_eq!(latest.uid, created.uid);
        assert_eq!(latest.id, created.id);
    }

    #[tokio::test]
    async fn test_insert_with_operation_assigns_ids() {
        let repo = InMemoryInfraRepository::new();
        let op = Operation::new(uid(1), InfraId(0), OperationType::Create, vec![]);

        let (infra, op) = repo.insert_with_operation(infra(), op).await.unwrap();

        assert_ne!(infra.id, InfraId(0));
        assert_eq!(op.infra_id, infra.id);
        assert_eq!(repo.list_operations(&infra).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_uid_conflicts_without_side_effects() {
        let repo = InMemoryInfraRepository::new();
        let (first, _) = repo
            .insert_with_operation(infra(), Operation::new(uid(1), InfraId(0), OperationType::Create, vec![]))
            .await
            .unwrap();

        let err = repo
            .insert_with_operation(infra(), Operation::new(uid(1), InfraId(0), OperationType::Create, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        let ids: Vec<InfraId> = repo
            .list_infras(ProjectId(4))
            .await
            .unwrap()
            .into_iter()
            .map(|infra| infra.id)
            .collect();
        assert_eq!(ids, vec![first.id]);
    }

    #[tokio::test]
    async fn test_read_infra_is_project_scoped() {
        let repo = InMemoryInfraRepository::new();
        let infra = repo.insert_infra(infra());

        assert!(repo.read_infra(ProjectId(4), infra.id).await.is_ok());
        assert!(repo.read_infra(ProjectId(5), infra.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_operations_keep_insertion_order() {
        let repo = InMemoryInfraRepository::new();
        let infra = repo.insert_infra(infra());

        for n in 1..=3 {
            repo.create_operation(Operation::new(uid(n), infra.id, OperationType::Update, vec![]))
                .await
                .unwrap();
        }

        let uids: Vec<OperationUid> = repo
            .list_operations(&infra)
            .await
            .unwrap()
            .into_iter()
            .map(|op| op.uid)
            .collect();
        assert_eq!(uids, vec![uid(1), uid(2), uid(3)]);
    }
}
