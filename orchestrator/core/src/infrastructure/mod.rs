// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod credentials;
pub mod db;
pub mod encryption;
pub mod event_bus;
pub mod github_client;
pub mod provisioner_client;
pub mod repositories;
pub mod telemetry;

pub use credentials::IntegrationCredentialValidator;
pub use encryption::{random_token, AesGcmCipher};
pub use event_bus::{DomainEvent, EventBus};
pub use github_client::GithubWorkflowClient;
pub use provisioner_client::ProvisionerClient;
