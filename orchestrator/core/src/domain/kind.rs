// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Kind Registry
//!
//! Per-kind behavior is looked up here instead of being switched on inline:
//!
//! - a [`Redactor`] projects decrypted `last_applied` values onto the handful
//!   of fields that may leave the system;
//! - an optional [`Postrenderer`] transforms (or rejects) values before they
//!   are dispatched to the provisioner.
//!
//! A new kind is supported by registering a handler; nothing else changes.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Kind-specific redaction and value post-processing

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::cluster::Cluster;
use crate::domain::infra::{Infra, InfraKind, Values};

/// Projects decrypted values onto the public subset for a kind.
pub trait Redactor: Send + Sync {
    fn redact(&self, values: &Values) -> BTreeMap<String, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Text,
    Number,
}

#[derive(Debug, Clone)]
struct Field {
    exposed_as: &'static str,
    source: &'static str,
    field_type: FieldType,
}

/// Redactor driven by a static field list.
///
/// Missing fields are exposed as their zero value (`""` or `"0"`). A field
/// holding the wrong JSON type means the payload does not belong to this kind,
/// so nothing is exposed at all.
#[derive(Debug, Clone, Default)]
pub struct FieldRedactor {
    fields: Vec<Field>,
}

impl FieldRedactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose string field `source` under `exposed_as`.
    pub fn text(mut self, exposed_as: &'static str, source: &'static str) -> Self {
        self.fields.push(Field {
            exposed_as,
            source,
            field_type: FieldType::Text,
        });
        self
    }

    /// Expose unsigned integer field `source` under `exposed_as`, formatted in decimal.
    pub fn number(mut self, exposed_as: &'static str, source: &'static str) -> Self {
        self.fields.push(Field {
            exposed_as,
            source,
            field_type: FieldType::Number,
        });
        self
    }
}

impl Redactor for FieldRedactor {
    fn redact(&self, values: &Values) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();

        for field in &self.fields {
            let rendered = match (field.field_type, values.get(field.source)) {
                (FieldType::Text, None | Some(Value::Null)) => String::new(),
                (FieldType::Number, None | Some(Value::Null)) => "0".to_string(),
                (FieldType::Text, Some(Value::String(s))) => s.clone(),
                (FieldType::Number, Some(Value::Number(n))) if n.is_u64() => n.to_string(),
                (_, Some(other)) => {
                    debug!(field = field.source, value_type = json_type(other), "Unexpected field type, redacting everything");
                    return BTreeMap::new();
                }
            };
            out.insert(field.exposed_as.to_string(), rendered);
        }

        out
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostrenderError {
    #[error("infra is not attached to a cluster")]
    MissingCluster,

    #[error("missing required value '{0}'")]
    MissingField(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

/// Inputs available to a postrenderer besides the values themselves.
#[derive(Debug, Clone, Copy)]
pub struct PostrenderContext<'a> {
    pub infra: &'a Infra,
    /// Resolved parent cluster for cluster-scoped infras.
    pub cluster: Option<&'a Cluster>,
}

/// Value transform applied right before dispatch. May reject the request, in
/// which case nothing is persisted and the provisioner is never called.
#[async_trait]
pub trait Postrenderer: Send + Sync {
    /// Whether this postrenderer runs for the given infra (kind already matched).
    fn applies_to(&self, infra: &Infra) -> bool;

    async fn run(&self, ctx: PostrenderContext<'_>, values: Values) -> Result<Values, PostrenderError>;
}

#[derive(Clone)]
pub struct KindHandler {
    pub redactor: Arc<dyn Redactor>,
    pub postrenderer: Option<Arc<dyn Postrenderer>>,
}

impl KindHandler {
    pub fn new(redactor: impl Redactor + 'static) -> Self {
        Self {
            redactor: Arc::new(redactor),
            postrenderer: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct KindRegistry {
    handlers: HashMap<InfraKind, KindHandler>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with redactors for every well-known kind. Postrenderers are
    /// attached separately since they may need collaborators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(InfraKind::ECR, KindHandler::new(FieldRedactor::new().text("ecr_name", "ecr_name")));
        registry.register(
            InfraKind::EKS,
            KindHandler::new(
                FieldRedactor::new()
                    .text("eks_name", "eks_name")
                    .text("machine_type", "machine_type"),
            ),
        );
        registry.register(InfraKind::GCR, KindHandler::new(FieldRedactor::new()));
        registry.register(InfraKind::GKE, KindHandler::new(FieldRedactor::new().text("gke_name", "gke_name")));
        registry.register(
            InfraKind::DOCR,
            KindHandler::new(
                FieldRedactor::new()
                    .text("docr_name", "docr_name")
                    .text("docr_subscription_tier", "docr_subscription_tier"),
            ),
        );
        registry.register(
            InfraKind::DOKS,
            KindHandler::new(
                FieldRedactor::new()
                    .text("cluster_name", "doks_name")
                    .text("do_region", "do_region"),
            ),
        );
        registry.register(
            InfraKind::RDS,
            KindHandler::new(
                FieldRedactor::new()
                    .number("cluster_id", "cluster_id")
                    .text("aws_region", "aws_region")
                    .text("db_name", "db_name"),
            ),
        );

        registry
    }

    /// Register or replace the handler for `kind`.
    pub fn register(&mut self, kind: InfraKind, handler: KindHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Attach a postrenderer to an already registered kind. Returns false when
    /// the kind is unknown.
    pub fn set_postrenderer(&mut self, kind: &InfraKind, postrenderer: Arc<dyn Postrenderer>) -> bool {
        match self.handlers.get_mut(kind) {
            Some(handler) => {
                handler.postrenderer = Some(postrenderer);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, kind: &InfraKind) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn redactor(&self, kind: &InfraKind) -> Option<&dyn Redactor> {
        self.handlers.get(kind).map(|handler| handler.redactor.as_ref())
    }

    /// Postrenderer to run for `infra`, if its kind has one and it applies.
    pub fn postrenderer_for(&self, infra: &Infra) -> Option<Arc<dyn Postrenderer>> {
        self.handlers
            .get(&infra.kind)
            .and_then(|handler| handler.postrenderer.clone())
            .filter(|postrenderer| postrenderer.applies_to(infra))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &InfraKind> {
        self.handlers.keys()
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(InfraKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: serde_json::Value) -> Values {
        v.as_object().cloned().unwrap()
    }

    fn redact(kind: &InfraKind, v: serde_json::Value) -> BTreeMap<String, String> {
        KindRegistry::with_defaults().redactor(kind).unwrap().redact(&values(v))
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_redaction_per_kind() {
        assert_eq!(
            redact(&InfraKind::ECR, json!({"ecr_name": "registry", "aws_secret": "s3cr3t"})),
            map(&[("ecr_name", "registry")])
        );
        assert_eq!(
            redact(&InfraKind::EKS, json!({"eks_name": "prod", "machine_type": "t3.medium", "kubeconfig": "..."})),
            map(&[("eks_name", "prod"), ("machine_type", "t3.medium")])
        );
        assert_eq!(redact(&InfraKind::GCR, json!({"gcp_key": "..."})), BTreeMap::new());
        assert_eq!(
            redact(&InfraKind::GKE, json!({"gke_name": "gk", "gcp_region": "us-east1"})),
            map(&[("gke_name", "gk")])
        );
        assert_eq!(
            redact(&InfraKind::DOCR, json!({"docr_name": "r", "docr_subscription_tier": "basic", "token": "x"})),
            map(&[("docr_name", "r"), ("docr_subscription_tier", "basic")])
        );
        assert_eq!(
            redact(&InfraKind::DOKS, json!({"doks_name": "k8s", "do_region": "nyc1"})),
            map(&[("cluster_name", "k8s"), ("do_region", "nyc1")])
        );
        assert_eq!(
            redact(
                &InfraKind::RDS,
                json!({"cluster_id": 12, "aws_region": "us-east-2", "db_name": "orders", "db_passwd": "hunter2"})
            ),
            map(&[("cluster_id", "12"), ("aws_region", "us-east-2"), ("db_name", "orders")])
        );
    }

    #[test]
    fn test_missing_fields_render_zero_values() {
        assert_eq!(
            redact(&InfraKind::RDS, json!({})),
            map(&[("cluster_id", "0"), ("aws_region", ""), ("db_name", "")])
        );
    }

    #[test]
    fn test_wrong_field_type_exposes_nothing() {
        assert_eq!(redact(&InfraKind::EKS, json!({"eks_name": 5})), BTreeMap::new());
        assert_eq!(redact(&InfraKind::RDS, json!({"cluster_id": "12"})), BTreeMap::new());
    }

    #[test]
    fn test_unknown_kind_has_no_redactor() {
        let registry = KindRegistry::with_defaults();
        let unknown = InfraKind::new("opensearch").unwrap();

        assert!(!registry.is_registered(&unknown));
        assert!(registry.redactor(&unknown).is_none());
    }

    #[test]
    fn test_register_new_kind() {
        let mut registry = KindRegistry::with_defaults();
        let kind = InfraKind::new("opensearch").unwrap();
        registry.register(kind.clone(), KindHandler::new(FieldRedactor::new().text("domain", "domain_name")));

        let out = registry.redactor(&kind).unwrap().redact(&values(json!({"domain_name": "search"})));
        assert_eq!(out, map(&[("domain", "search")]));
        assert_eq!(registry.kinds().count(), 8);
    }
}
