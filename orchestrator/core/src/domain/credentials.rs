// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credential check run before every mutating verb.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::infra::{CloudProvider, Infra, ProjectId};

/// Cloud integrations a caller offers for an operation. Zero and `None` both
/// mean "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraCredentials {
    #[serde(default)]
    pub aws_integration_id: Option<u64>,
    #[serde(default)]
    pub gcp_integration_id: Option<u64>,
    #[serde(default)]
    pub do_integration_id: Option<u64>,
}

impl InfraCredentials {
    pub fn aws(id: u64) -> Self {
        Self {
            aws_integration_id: Some(id),
            ..Self::default()
        }
    }

    pub fn gcp(id: u64) -> Self {
        Self {
            gcp_integration_id: Some(id),
            ..Self::default()
        }
    }

    pub fn digital_ocean(id: u64) -> Self {
        Self {
            do_integration_id: Some(id),
            ..Self::default()
        }
    }

    pub fn for_provider(&self, provider: CloudProvider) -> Option<u64> {
        let id = match provider {
            CloudProvider::Aws => self.aws_integration_id,
            CloudProvider::Gcp => self.gcp_integration_id,
            CloudProvider::DigitalOcean => self.do_integration_id,
        };
        id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no {0} integration supplied")]
    Missing(CloudProvider),

    #[error("{provider} integration {supplied} does not match the integration configured on the infra")]
    Mismatch { provider: CloudProvider, supplied: u64 },
}

#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn check_credentials(
        &self,
        project_id: ProjectId,
        infra: &Infra,
        supplied: &InfraCredentials,
    ) -> Result<(), CredentialError>;
}
