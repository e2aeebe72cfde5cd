// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Preview Environments
//!
//! An [`Environment`] binds a git repository to a cluster; each pull request
//! against it gets a [`Deployment`]. The orchestrator only reads these records
//! to (re)dispatch the repository's deployment workflow.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Records consumed by the deployment workflow trigger

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::infra::{ClusterId, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(pub u64);

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub project_id: ProjectId,
    pub cluster_id: ClusterId,
    pub name: String,
    pub git_repo_owner: String,
    pub git_repo_name: String,
}

impl Environment {
    /// Workflow file the repository must contain for this environment.
    pub fn workflow_file_name(&self) -> String {
        format!("porter_{}_env.yml", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Created,
    Creating,
    Inactive,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub environment_id: EnvironmentId,
    pub status: DeploymentStatus,
    pub pull_request_id: u64,
    pub pr_name: String,
    pub pr_branch_from: String,
    pub pr_branch_into: String,
}

impl Deployment {
    pub fn is_inactive(&self) -> bool {
        self.status == DeploymentStatus::Inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_file_name() {
        let env = Environment {
            id: EnvironmentId(1),
            project_id: ProjectId(2),
            cluster_id: ClusterId(3),
            name: "preview".to_string(),
            git_repo_owner: "acme".to_string(),
            git_repo_name: "shop".to_string(),
        };

        assert_eq!(env.workflow_file_name(), "porter_preview_env.yml");
    }
}
