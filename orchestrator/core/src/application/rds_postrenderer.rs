// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # RDS Postrenderer
//!
//! A database created inside an existing cluster has to land in the cluster's
//! VPC and region. This postrenderer pins those values from the cluster
//! record before dispatch, so a caller cannot point the database at a
//! different network.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Kind-specific value transform for cluster-scoped `rds` infras

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::infra::{Infra, Values};
use crate::domain::kind::{PostrenderContext, PostrenderError, Postrenderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct RdsPostrenderer;

impl RdsPostrenderer {
    pub fn new() -> Self {
        Self
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, PostrenderError> {
    if value.is_empty() {
        return Err(PostrenderError::InvalidField {
            field: field.to_string(),
            reason: "cluster has no value for it".to_string(),
        });
    }
    Ok(value)
}

#[async_trait]
impl Postrenderer for RdsPostrenderer {
    fn applies_to(&self, infra: &Infra) -> bool {
        infra.is_cluster_scoped()
    }

    async fn run(&self, ctx: PostrenderContext<'_>, mut values: Values) -> Result<Values, PostrenderError> {
        let cluster = ctx.cluster.ok_or(PostrenderError::MissingCluster)?;
        let vpc_id = required("vpc_id", &cluster.vpc_id)?;
        let region = required("aws_region", &cluster.aws_region)?;

        match values.get("db_name") {
            Some(Value::String(name)) if !name.is_empty() => {}
            _ => return Err(PostrenderError::MissingField("db_name".to_string())),
        }

        if let Some(requested) = values.get("aws_region") {
            if requested.as_str() != Some(region) {
                return Err(PostrenderError::InvalidField {
                    field: "aws_region".to_string(),
                    reason: format!("database must be created in the cluster region {region}"),
                });
            }
        }

        values.insert("cluster_id".to_string(), Value::from(cluster.id.0));
        values.insert("cluster_name".to_string(), Value::from(cluster.name.clone()));
        values.insert("aws_region".to_string(), Value::from(region));
        values.insert("vpc_id".to_string(), Value::from(vpc_id));

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::Cluster;
    use crate::domain::infra::{ClusterId, InfraKind, ProjectId, UserId};
    use serde_json::json;

    fn rds() -> Infra {
        Infra::new(ProjectId(4), InfraKind::RDS, "ab12cd", UserId(1)).with_parent_cluster(ClusterId(11))
    }

    fn cluster() -> Cluster {
        Cluster::new(ClusterId(11), ProjectId(4), "prod").with_aws_network("us-east-2", "vpc-0abc")
    }

    fn values(v: serde_json::Value) -> Values {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_applies_only_to_cluster_scoped() {
        let standalone = Infra::new(ProjectId(4), InfraKind::RDS, "ab12cd", UserId(1));
        assert!(!RdsPostrenderer.applies_to(&standalone));
        assert!(RdsPostrenderer.applies_to(&rds()));
    }

    #[tokio::test]
    async fn test_pins_cluster_network() {
        let infra = rds();
        let cluster = cluster();
        let ctx = PostrenderContext {
            infra: &infra,
            cluster: Some(&cluster),
        };

        let out = RdsPostrenderer
            .run(ctx, values(json!({"db_name": "orders", "instance_class": "db.t3.micro"})))
            .await
            .unwrap();

        assert_eq!(out["cluster_id"], json!(11));
        assert_eq!(out["cluster_name"], json!("prod"));
        assert_eq!(out["aws_region"], json!("us-east-2"));
        assert_eq!(out["vpc_id"], json!("vpc-0abc"));
        assert_eq!(out["instance_class"], json!("db.t3.micro"));
    }

    #[tokio::test]
    async fn test_rejects_missing_db_name() {
        let infra = rds();
        let cluster = cluster();
        let ctx = PostrenderContext {
            infra: &infra,
            cluster: Some(&cluster),
        };

        let err = RdsPostrenderer.run(ctx, values(json!({"db_name": ""}))).await.unwrap_err();
        assert_eq!(err, PostrenderError::MissingField("db_name".into()));
    }

    #[tokio::test]
    async fn test_rejects_region_outside_cluster() {
        let infra = rds();
        let cluster = cluster();
        let ctx = PostrenderContext {
            infra: &infra,
            cluster: Some(&cluster),
        };

        let err = RdsPostrenderer
            .run(ctx, values(json!({"db_name": "orders", "aws_region": "eu-west-1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, PostrenderError::InvalidField { ref field, .. } if field == "aws_region"));
    }

    #[tokio::test]
    async fn test_rejects_cluster_without_vpc() {
        let infra = rds();
        let cluster = Cluster::new(ClusterId(11), ProjectId(4), "prod");
        let ctx = PostrenderContext {
            infra: &infra,
            cluster: Some(&cluster),
        };

        let err = RdsPostrenderer.run(ctx, values(json!({"db_name": "orders"}))).await.unwrap_err();
        assert!(matches!(err, PostrenderError::InvalidField { ref field, .. } if field == "vpc_id"));

        let ctx = PostrenderContext {
            infra: &infra,
            cluster: None,
        };
        let err = RdsPostrenderer.run(ctx, values(json!({"db_name": "orders"}))).await.unwrap_err();
        assert_eq!(err, PostrenderError::MissingCluster);
    }
}
