// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Default credential check: the caller must present an integration for the
//! kind's cloud, and it must be the one the infra was created with.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::credentials::{CredentialError, CredentialValidator, InfraCredentials};
use crate::domain::infra::{CloudProvider, Infra, ProjectId};

#[derive(Debug, Clone, Default)]
pub struct IntegrationCredentialValidator;

impl IntegrationCredentialValidator {
    pub fn new() -> Self {
        Self
    }
}

fn configured(infra: &Infra, provider: CloudProvider) -> Option<u64> {
    let id = match provider {
        CloudProvider::Aws => infra.aws_integration_id,
        CloudProvider::Gcp => infra.gcp_integration_id,
        CloudProvider::DigitalOcean => infra.do_integration_id,
    };
    id.filter(|id| *id != 0)
}

#[async_trait]
impl CredentialValidator for IntegrationCredentialValidator {
    async fn check_credentials(
        &self,
        _project_id: ProjectId,
        infra: &Infra,
        supplied: &InfraCredentials,
    ) -> Result<(), CredentialError> {
        let Some(provider) = infra.kind.cloud_provider() else {
            debug!(kind = %infra.kind, "Kind has no cloud provider, skipping credential check");
            return Ok(());
        };

        let supplied = supplied.for_provider(provider).ok_or(CredentialError::Missing(provider))?;

        match configured(infra, provider) {
            Some(expected) if expected != supplied => Err(CredentialError::Mismatch { provider, supplied }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::{InfraKind, UserId};

    fn eks(aws: Option<u64>) -> Infra {
        let mut infra = Infra::new(ProjectId(1), InfraKind::EKS, "ab12cd", UserId(1));
        infra.aws_integration_id = aws;
        infra
    }

    #[tokio::test]
    async fn test_matching_integration_passes() {
        let validator = IntegrationCredentialValidator::new();
        assert!(validator
            .check_credentials(ProjectId(1), &eks(Some(3)), &InfraCredentials::aws(3))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wrong_cloud_is_missing() {
        let validator = IntegrationCredentialValidator::new();
        let err = validator
            .check_credentials(ProjectId(1), &eks(Some(3)), &InfraCredentials::gcp(3))
            .await
            .unwrap_err();
        assert_eq!(err, CredentialError::Missing(CloudProvider::Aws));
    }

    #[tokio::test]
    async fn test_zero_id_counts_as_missing() {
        let validator = IntegrationCredentialValidator::new();
        assert!(validator
            .check_credentials(ProjectId(1), &eks(None), &InfraCredentials::aws(0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mismatch() {
        let validator = IntegrationCredentialValidator::new();
        let err = validator
            .check_credentials(ProjectId(1), &eks(Some(3)), &InfraCredentials::aws(4))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CredentialError::Mismatch {
                provider: CloudProvider::Aws,
                supplied: 4
            }
        );
    }

    #[tokio::test]
    async fn test_unconfigured_infra_accepts_any_integration() {
        let validator = IntegrationCredentialValidator::new();
        assert!(validator
            .check_credentials(ProjectId(1), &eks(None), &InfraCredentials::aws(9))
            .await
            .is_ok());
    }
}
