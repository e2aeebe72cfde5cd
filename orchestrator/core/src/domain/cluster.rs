// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cluster records, read-only from the orchestrator's point of view.
//!
//! Cluster-scoped infras (e.g. an RDS instance living inside an EKS cluster)
//! point at one of these through `parent_cluster_id`.

use serde::{Deserialize, Serialize};

use crate::domain::infra::{ClusterId, ProjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub project_id: ProjectId,
    pub name: String,
    /// Empty for clusters not hosted on AWS.
    pub aws_region: String,
    pub vpc_id: String,
}

impl Cluster {
    pub fn new(id: ClusterId, project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            aws_region: String::new(),
            vpc_id: String::new(),
        }
    }

    pub fn with_aws_network(mut self, region: impl Into<String>, vpc_id: impl Into<String>) -> Self {
        self.aws_region = region.into();
        self.vpc_id = vpc_id.into();
        self
    }
}
