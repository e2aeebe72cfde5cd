// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Infra
//!
//! Infras and their operation logs (`infras` / `operations` tables).
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `InfraRepository` on PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::infra::{ClusterId, Infra, InfraId, InfraKind, InfraStatus, ProjectId, UserId};
use crate::domain::operation::{Operation, OperationType, OperationUid};
use crate::domain::repository::{InfraRepository, RepositoryError};

const INFRA_COLUMNS: &str = "id, project_id, kind, api_version, source_link, source_version, suffix, status, \
     created_by_user_id, parent_cluster_id, aws_integration_id, gcp_integration_id, do_integration_id, \
     database_id, last_applied, created_at, updated_at";

const OPERATION_COLUMNS: &str =
    "id, uid, infra_id, type, status, errored, error, last_applied, created_at, updated_at";

pub struct PostgresInfraRepository {
    pool: PgPool,
}

impl PostgresInfraRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Ids are BIGINT. An id past `i64::MAX` (e.g. parsed from a workspace
/// token) can never name a stored row, so it reads as not found.
pub(super) fn to_db(id: u64) -> Result<i64, RepositoryError> {
    i64::try_from(id).map_err(|_| RepositoryError::NotFound(format!("id {id} is out of range")))
}

pub(super) fn opt_to_db(id: Option<u64>) -> Result<Option<i64>, RepositoryError> {
    id.map(to_db).transpose()
}

#[async_trait]
impl InfraRepository for PostgresInfraRepository {
    async fn read_infra(&self, project_id: ProjectId, infra_id: InfraId) -> Result<Infra, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {INFRA_COLUMNS} FROM infras WHERE id = $1 AND project_id = $2"
        ))
        .bind(to_db(infra_id.0)?)
        .bind(to_db(project_id.0)?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_infra_row(&row),
            None => Err(RepositoryError::NotFound(format!("infra {} in project {}", infra_id, project_id))),
        }
    }

    async fn list_infras(&self, project_id: ProjectId) -> Result<Vec<Infra>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {INFRA_COLUMNS} FROM infras WHERE project_id = $1 ORDER BY id ASC"
        ))
        .bind(to_db(project_id.0)?)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_infra_row).collect()
    }

    async fn insert_with_operation(
        &self,
        infra: Infra,
        operation: Operation,
    ) -> Result<(Infra, Operation), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO infras (
                project_id, kind, api_version, source_link, source_version, suffix, status,
                created_by_user_id, parent_cluster_id, aws_integration_id, gcp_integration_id,
                do_integration_id, database_id, last_applied, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {INFRA_COLUMNS}
            "#
        ))
        .bind(to_db(infra.project_id.0)?)
        .bind(infra.kind.as_str())
        .bind(&infra.api_version)
        .bind(&infra.source_link)
        .bind(&infra.source_version)
        .bind(infra.suffix())
        .bind(infra.status.as_str())
        .bind(to_db(infra.created_by_user_id.0)?)
        .bind(opt_to_db(infra.parent_cluster_id.map(|c| c.0))?)
        .bind(opt_to_db(infra.aws_integration_id)?)
        .bind(opt_to_db(infra.gcp_integration_id)?)
        .bind(opt_to_db(infra.do_integration_id)?)
        .bind(opt_to_db(infra.database_id)?)
        .bind(&infra.last_applied)
        .bind(infra.created_at)
        .bind(infra.updated_at)
        .fetch_one(&mut *tx)
        .await?;
        let infra = parse_infra_row(&row)?;

        let operation = Operation {
            infra_id: infra.id,
            ..operation
        };
        let row = insert_operation_query(&operation)?.fetch_one(&mut *tx).await?;
        let operation = parse_operation_row(&row)?;

        tx.commit().await?;
        Ok((infra, operation))
    }

    async fn update_infra(&self, infra: &Infra) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE infras SET
                api_version = $3,
                source_link = $4,
                source_version = $5,
                status = $6,
                parent_cluster_id = $7,
                aws_integration_id = $8,
                gcp_integration_id = $9,
                do_integration_id = $10,
                database_id = $11,
                last_applied = $12,
                updated_at = $13
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(to_db(infra.id.0)?)
        .bind(to_db(infra.project_id.0)?)
        .bind(&infra.api_version)
        .bind(&infra.source_link)
        .bind(&infra.source_version)
        .bind(infra.status.as_str())
        .bind(opt_to_db(infra.parent_cluster_id.map(|c| c.0))?)
        .bind(opt_to_db(infra.aws_integration_id)?)
        .bind(opt_to_db(infra.gcp_integration_id)?)
        .bind(opt_to_db(infra.do_integration_id)?)
        .bind(opt_to_db(infra.database_id)?)
        .bind(&infra.last_applied)
        .bind(infra.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("infra {}", infra.id)));
        }

        Ok(())
    }

    async fn get_latest_operation(&self, infra: &Infra) -> Result<Operation, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE infra_id = $1 ORDER BY id DESC LIMIT 1"
        ))
        .bind(to_db(infra.id.0)?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_operation_row(&row),
            None => Err(RepositoryError::NotFound(format!("no operations for infra {}", infra.id))),
        }
    }

    async fn list_operations(&self, infra: &Infra) -> Result<Vec<Operation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE infra_id = $1 ORDER BY id ASC"
        ))
        .bind(to_db(infra.id.0)?)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_operation_row).collect()
    }

    async fn read_operation(&self, infra: &Infra, uid: &OperationUid) -> Result<Operation, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE infra_id = $1 AND uid = $2"
        ))
        .bind(to_db(infra.id.0)?)
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_operation_row(&row),
            None => Err(RepositoryError::NotFound(format!("operation {} for infra {}", uid, infra.id))),
        }
    }

    async fn create_operation(&self, operation: Operation) -> Result<Operation, RepositoryError> {
        let row = insert_operation_query(&operation)?.fetch_one(&self.pool).await?;
        parse_operation_row(&row)
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE operations SET
                status = $3,
                errored = $4,
                error = $5,
                last_applied = $6,
                updated_at = $7
            WHERE uid = $1 AND infra_id = $2
            "#,
        )
        .bind(operation.uid.as_str())
        .bind(to_db(operation.infra_id.0)?)
        .bind(&operation.status)
        .bind(operation.errored)
        .bind(&operation.error)
        .bind(&operation.last_applied)
        .bind(operation.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("operation {}", operation.uid)));
        }

        Ok(())
    }
}

fn insert_operation_query(
    operation: &Operation,
) -> Result<sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>, RepositoryError> {
    let query = sqlx::query(
        r#"
        INSERT INTO operations (
            uid, infra_id, type, status, errored, error, last_applied, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, uid, infra_id, type, status, errored, error, last_applied, created_at, updated_at
        "#,
    )
    .bind(operation.uid.as_str())
    .bind(to_db(operation.infra_id.0)?)
    .bind(operation.operation_type.as_str())
    .bind(&operation.status)
    .bind(operation.errored)
    .bind(&operation.error)
    .bind(&operation.last_applied)
    .bind(operation.created_at)
    .bind(operation.updated_at);

    Ok(query)
}

fn parse_infra_row(row: &PgRow) -> Result<Infra, RepositoryError> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let kind = InfraKind::new(kind).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let status = status
        .parse::<InfraStatus>()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    let mut infra = Infra::new(
        ProjectId(row.try_get::<i64, _>("project_id")? as u64),
        kind,
        row.try_get::<String, _>("suffix")?,
        UserId(row.try_get::<i64, _>("created_by_user_id")? as u64),
    );

    infra.id = InfraId(row.try_get::<i64, _>("id")? as u64);
    infra.api_version = row.try_get("api_version")?;
    infra.source_link = row.try_get("source_link")?;
    infra.source_version = row.try_get("source_version")?;
    infra.status = status;
    infra.parent_cluster_id = row
        .try_get::<Option<i64>, _>("parent_cluster_id")?
        .map(|id| ClusterId(id as u64));
    infra.aws_integration_id = row.try_get::<Option<i64>, _>("aws_integration_id")?.map(|id| id as u64);
    infra.gcp_integration_id = row.try_get::<Option<i64>, _>("gcp_integration_id")?.map(|id| id as u64);
    infra.do_integration_id = row.try_get::<Option<i64>, _>("do_integration_id")?.map(|id| id as u64);
    infra.database_id = row.try_get::<Option<i64>, _>("database_id")?.map(|id| id as u64);
    infra.last_applied = row.try_get("last_applied")?;
    infra.created_at = created_at;
    infra.updated_at = updated_at;

    Ok(infra)
}

fn parse_operation_row(row: &PgRow) -> Result<Operation, RepositoryError> {
    let uid: String = row.try_get("uid")?;
    let operation_type: String = row.try_get("type")?;

    Ok(Operation {
        id: row.try_get::<i64, _>("id")? as u64,
        uid: OperationUid::new(uid).map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        infra_id: InfraId(row.try_get::<i64, _>("infra_id")? as u64),
        operation_type: operation_type
            .parse::<OperationType>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        status: row.try_get("status")?,
        errored: row.try_get("errored")?,
        error: row.try_get("error")?,
        last_applied: row.try_get("last_applied")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
