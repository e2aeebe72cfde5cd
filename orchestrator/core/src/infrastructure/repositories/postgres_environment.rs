// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Environment
//!
//! Preview environments and their per-pull-request deployments. Both lookups
//! are scoped to the environment's project and cluster.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `EnvironmentRepository` on PostgreSQL

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::environment::{Deployment, DeploymentId, DeploymentStatus, Environment, EnvironmentId};
use crate::domain::infra::{ClusterId, ProjectId};
use crate::domain::repository::{EnvironmentRepository, RepositoryError};

use super::postgres_infra::to_db;

pub struct PostgresEnvironmentRepository {
    pool: PgPool,
}

impl PostgresEnvironmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnvironmentRepository for PostgresEnvironmentRepository {
    async fn read_deployment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        deployment_id: DeploymentId,
    ) -> Result<Deployment, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT d.id, d.environment_id, d.status, d.pull_request_id,
                   d.pr_name, d.pr_branch_from, d.pr_branch_into
            FROM deployments d
            JOIN environments e ON e.id = d.environment_id
            WHERE d.id = $1 AND e.project_id = $2 AND e.cluster_id = $3
            "#,
        )
        .bind(to_db(deployment_id.0)?)
        .bind(to_db(project_id.0)?)
        .bind(to_db(cluster_id.0)?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_deployment_row(&row),
            None => Err(RepositoryError::NotFound(format!("deployment {}", deployment_id))),
        }
    }

    async fn read_environment_by_id(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        environment_id: EnvironmentId,
    ) -> Result<Environment, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, cluster_id, name, git_repo_owner, git_repo_name
            FROM environments
            WHERE id = $1 AND project_id = $2 AND cluster_id = $3
            "#,
        )
        .bind(to_db(environment_id.0)?)
        .bind(to_db(project_id.0)?)
        .bind(to_db(cluster_id.0)?)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound(format!("environment {}", environment_id)));
        };

        Ok(Environment {
            id: EnvironmentId(row.try_get::<i64, _>("id")? as u64),
            project_id: ProjectId(row.try_get::<i64, _>("project_id")? as u64),
            cluster_id: ClusterId(row.try_get::<i64, _>("cluster_id")? as u64),
            name: row.try_get("name")?,
            git_repo_owner: row.try_get("git_repo_owner")?,
            git_repo_name: row.try_get("git_repo_name")?,
        })
    }
}

fn parse_deployment_row(row: &PgRow) -> Result<Deployment, RepositoryError> {
    let status: String = row.try_get("status")?;
    let status: DeploymentStatus = serde_json::from_value(serde_json::Value::String(status))?;

    Ok(Deployment {
        id: DeploymentId(row.try_get::<i64, _>("id")? as u64),
        environment_id: EnvironmentId(row.try_get::<i64, _>("environment_id")? as u64),
        status,
        pull_request_id: row.try_get::<i64, _>("pull_request_id")? as u64,
        pr_name: row.try_get("pr_name")?,
        pr_branch_from: row.try_get("pr_branch_from")?,
        pr_branch_into: row.try_get("pr_branch_into")?,
    })
}
