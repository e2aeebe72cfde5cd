// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::cluster::Cluster;
use crate::domain::infra::{ClusterId, ProjectId};
use crate::domain::repository::{ClusterRepository, RepositoryError};

use super::postgres_infra::to_db;

pub struct PostgresClusterRepository {
    pool: PgPool,
}

impl PostgresClusterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterRepository for PostgresClusterRepository {
    async fn read_cluster(&self, project_id: ProjectId, cluster_id: ClusterId) -> Result<Cluster, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, name, aws_region, vpc_id
            FROM clusters
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(to_db(cluster_id.0)?)
        .bind(to_db(project_id.0)?)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound(format!(
                "cluster {} in project {}",
                cluster_id, project_id
            )));
        };

        Ok(Cluster {
            id: ClusterId(row.try_get::<i64, _>("id")? as u64),
            project_id: ProjectId(row.try_get::<i64, _>("project_id")? as u64),
            name: row.try_get("name")?,
            aws_region: row.try_get("aws_region")?,
            vpc_id: row.try_get("vpc_id")?,
        })
    }
}
