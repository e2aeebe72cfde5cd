// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod deployment_trigger;
pub mod error;
pub mod infra_locks;
pub mod provisioning;
pub mod rds_postrenderer;
pub mod repository_factory;

// Re-export use cases for convenience
pub use bootstrap::{build_services, OrchestratorServices};
pub use deployment_trigger::{DeploymentTriggerUseCase, StandardDeploymentTrigger};
pub use error::OrchestratorError;
pub use provisioning::{
    CreateInfraRequest, CreatedInfra, DispatchResult, OperationOutcome, OperationRequest, ProvisioningService,
    ProvisioningSettings, StandardProvisioningService,
};
