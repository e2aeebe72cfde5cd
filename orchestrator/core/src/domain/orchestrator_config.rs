// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Orchestrator Configuration Types
//
// Defines the configuration schema of the infra orchestrator:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Provisioner endpoint (injected, never a hardcoded address)
// - Encryption key for last-applied payloads
// - Identifier sizes, storage backend, concurrency hardening
// - GitHub workflow dispatch and observability settings

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::operation::DEFAULT_OPERATION_UID_BYTES;
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "infra.porter.run/v1";
pub const KIND: &str = "OrchestratorConfig";

/// Top-level Kubernetes-style orchestrator configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfigManifest {
    /// API version (must be "infra.porter.run/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "OrchestratorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: OrchestratorConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfigSpec {
    #[serde(default)]
    pub provisioner: ProvisionerConfig,

    #[serde(default)]
    pub encryption: EncryptionConfig,

    #[serde(default)]
    pub identifiers: IdentifierConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Base URL of the provisioner API, e.g. "http://provisioner:8082/api/v1"
    #[serde(default = "default_provisioner_endpoint")]
    pub endpoint: String,

    /// Per-request timeout applied by the HTTP client
    #[serde(default = "default_provisioner_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte AES key (supports "env:VAR_NAME")
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierConfig {
    #[serde(default = "default_operation_uid_bytes")]
    pub operation_uid_bytes: usize,

    #[serde(default = "default_suffix_bytes")]
    pub suffix_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Serialize lifecycle requests per infra inside this process
    #[serde(default)]
    pub single_flight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api")]
    pub api_base: String,

    /// Token used for workflow dispatches (supports "env:VAR_NAME")
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of the compact format
    #[serde(default)]
    pub json: bool,
}

fn default_provisioner_endpoint() -> String {
    "http://localhost:8082/api/v1".to_string()
}

fn default_provisioner_timeout() -> u64 {
    30
}

fn default_operation_uid_bytes() -> usize {
    DEFAULT_OPERATION_UID_BYTES
}

fn default_suffix_bytes() -> usize {
    6
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provisioner_endpoint(),
            timeout_seconds: default_provisioner_timeout(),
        }
    }
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            operation_uid_bytes: default_operation_uid_bytes(),
            suffix_bytes: default_suffix_bytes(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Default for OrchestratorConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "infra-orchestrator".to_string(),
                labels: None,
            },
            spec: OrchestratorConfigSpec::default(),
        }
    }
}

/// Resolve a config value that may reference an environment variable as "env:VAR_NAME".
pub fn resolve_env_value(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' referenced by config is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl OrchestratorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. INFRA_ORCHESTRATOR_CONFIG_PATH environment variable
    /// 2. ./infra-orchestrator.yaml (working directory)
    /// 3. /etc/infra-orchestrator/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("INFRA_ORCHESTRATOR_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./infra-orchestrator.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        let system_config = PathBuf::from("/etc/infra-orchestrator/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("INFRA_PROVISIONER_ENDPOINT") {
            tracing::info!("Environment override: INFRA_PROVISIONER_ENDPOINT={}", endpoint);
            self.spec.provisioner.endpoint = endpoint;
        }

        if let Ok(val) = std::env::var("INFRA_SINGLE_FLIGHT") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.spec.concurrency.single_flight = true,
                "false" | "0" | "no" | "off" => self.spec.concurrency.single_flight = false,
                _ => {
                    tracing::warn!(
                        "Invalid value for INFRA_SINGLE_FLIGHT: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.provisioner.endpoint.is_empty() {
            anyhow::bail!("spec.provisioner.endpoint cannot be empty");
        }

        if self.spec.identifiers.operation_uid_bytes == 0 || self.spec.identifiers.suffix_bytes == 0 {
            anyhow::bail!("spec.identifiers byte sizes must be greater than zero");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres && self.spec.storage.connection_string.is_none() {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }

        Ok(())
    }

    /// Storage backend with any "env:" connection string resolved.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageBackendKind::InMemory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .connection_string
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.connection_string is not set"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_value(raw)?,
                }))
            }
        }
    }
}
