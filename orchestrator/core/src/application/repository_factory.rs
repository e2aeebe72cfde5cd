// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration, keeping the domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Select in-memory or PostgreSQL repositories at startup

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::domain::repository::{ClusterRepository, EnvironmentRepository, InfraRepository, StorageBackend};
use crate::infrastructure::repositories::{
    InMemoryClusterRepository, InMemoryEnvironmentRepository, InMemoryInfraRepository, PostgresClusterRepository,
    PostgresEnvironmentRepository, PostgresInfraRepository,
};

fn require_pool(pool: Option<&PgPool>) -> Result<PgPool> {
    pool.cloned()
        .ok_or_else(|| anyhow::anyhow!("PostgreSQL backend selected but no connection pool was provided"))
}

/// Creates an InfraRepository implementation based on the configured backend
pub fn create_infra_repository(backend: &StorageBackend, pool: Option<&PgPool>) -> Result<Arc<dyn InfraRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryInfraRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresInfraRepository::new(require_pool(pool)?)),
    })
}

/// Creates a ClusterRepository implementation based on the configured backend
pub fn create_cluster_repository(
    backend: &StorageBackend,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn ClusterRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryClusterRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresClusterRepository::new(require_pool(pool)?)),
    })
}

/// Creates an EnvironmentRepository implementation based on the configured backend
pub fn create_environment_repository(
    backend: &StorageBackend,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn EnvironmentRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryEnvironmentRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresEnvironmentRepository::new(require_pool(pool)?)),
    })
}
