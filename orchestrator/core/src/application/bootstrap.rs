// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Service Wiring
//!
//! Builds the application services from an [`OrchestratorConfigManifest`]:
//! storage backend, cipher, provisioner client, kind registry and the
//! optional GitHub workflow dispatcher.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for embedding binaries

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::application::deployment_trigger::{DeploymentTriggerUseCase, StandardDeploymentTrigger};
use crate::application::provisioning::{ProvisioningService, ProvisioningSettings, StandardProvisioningService};
use crate::application::repository_factory::{
    create_cluster_repository, create_environment_repository, create_infra_repository,
};
use crate::domain::orchestrator_config::{resolve_env_value, OrchestratorConfigManifest, OrchestratorConfigSpec};
use crate::domain::repository::StorageBackend;
use crate::infrastructure::db::Database;
use crate::infrastructure::encryption::AesGcmCipher;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::github_client::GithubWorkflowClient;
use crate::infrastructure::provisioner_client::ProvisionerClient;

pub struct OrchestratorServices {
    pub provisioning: Arc<dyn ProvisioningService>,
    /// Present only when `spec.github` is configured.
    pub deployments: Option<Arc<dyn DeploymentTriggerUseCase>>,
    pub event_bus: Arc<EventBus>,
}

impl From<&OrchestratorConfigSpec> for ProvisioningSettings {
    fn from(spec: &OrchestratorConfigSpec) -> Self {
        Self {
            operation_uid_bytes: spec.identifiers.operation_uid_bytes,
            suffix_bytes: spec.identifiers.suffix_bytes,
            single_flight: spec.concurrency.single_flight,
        }
    }
}

pub async fn build_services(config: &OrchestratorConfigManifest) -> Result<OrchestratorServices> {
    config.validate()?;
    let spec = &config.spec;

    let key = resolve_env_value(&spec.encryption.key)?;
    if key.is_empty() {
        anyhow::bail!("spec.encryption.key must be set");
    }
    let cipher = AesGcmCipher::from_base64(&key).context("Invalid spec.encryption.key")?;

    let backend = config.storage_backend()?;
    let database = match &backend {
        StorageBackend::PostgreSQL(pg) => {
            let db = Database::new(&pg.connection_string)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to apply migrations")?;
            Some(db)
        }
        StorageBackend::InMemory => None,
    };
    let pool = database.as_ref().map(Database::get_pool);

    let event_bus = Arc::new(EventBus::with_default_capacity());

    let provisioner = ProvisionerClient::new(
        spec.provisioner.endpoint.clone(),
        Duration::from_secs(spec.provisioner.timeout_seconds),
    )?;

    let provisioning = StandardProvisioningService::new(
        create_infra_repository(&backend, pool)?,
        create_cluster_repository(&backend, pool)?,
        Arc::new(provisioner),
        Arc::new(cipher),
        event_bus.clone(),
    )
    .with_settings(ProvisioningSettings::from(spec));

    let deployments = match &spec.github {
        Some(github) => {
            let token = resolve_env_value(&github.token)?;
            let dispatcher = GithubWorkflowClient::new(github.api_base.clone(), token);
            let trigger = StandardDeploymentTrigger::new(
                create_environment_repository(&backend, pool)?,
                Arc::new(dispatcher),
                event_bus.clone(),
            );
            Some(Arc::new(trigger) as Arc<dyn DeploymentTriggerUseCase>)
        }
        None => None,
    };

    info!(
        provisioner = %spec.provisioner.endpoint,
        storage = ?spec.storage.backend,
        single_flight = spec.concurrency.single_flight,
        deployments = deployments.is_some(),
        "Orchestrator services ready"
    );

    Ok(OrchestratorServices {
        provisioning: Arc::new(provisioning),
        deployments,
        event_bus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::ProjectId;
    use crate::domain::orchestrator_config::GithubConfig;

    fn config() -> OrchestratorConfigManifest {
        let mut config = OrchestratorConfigManifest::default();
        config.spec.encryption.key = AesGcmCipher::generate_key();
        config
    }

    #[tokio::test]
    async fn test_builds_in_memory_services() {
        let services = build_services(&config()).await.unwrap();

        assert!(services.deployments.is_none());
        assert!(services
            .provisioning
            .list_infras(ProjectId(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_github_section_enables_deployments() {
        let mut config = config();
        config.spec.github = Some(GithubConfig {
            api_base: "https://api.github.com".to_string(),
            token: "ghp_test".to_string(),
        });

        let services = build_services(&config).await.unwrap();
        assert!(services.deployments.is_some());
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected() {
        let config = OrchestratorConfigManifest::default();
        assert!(build_services(&config).await.is_err());
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = config();
        config.spec.identifiers.operation_uid_bytes = 8;
        config.spec.concurrency.single_flight = true;

        let settings = ProvisioningSettings::from(&config.spec);
        assert_eq!(settings.operation_uid_bytes, 8);
        assert_eq!(settings.suffix_bytes, 6);
        assert!(settings.single_flight);
    }
}
