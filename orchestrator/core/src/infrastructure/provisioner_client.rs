// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Provisioner HTTP Client
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Enqueue apply requests on the external provisioner
//! - **Integration:** Orchestrator → `POST {endpoint}/projects/{project}/infras/{infra}/apply`
//!
//! The endpoint comes from `spec.provisioner.endpoint`; there is no built-in
//! default address at this layer.
//!
//! # Usage
//!
//! ```ignore
//! let client = ProvisionerClient::new("http://provisioner:8082/api/v1", Duration::from_secs(30))?;
//! let handle = client.apply(project_id, infra_id, &request).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::domain::infra::{InfraId, ProjectId};
use crate::domain::provisioner::{ApplyRequest, OperationHandle, Provisioner, ProvisionerError};

pub struct ProvisionerClient {
    /// Base URL without trailing slash
    base_url: String,
    client: Client,
}

impl ProvisionerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProvisionerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionerError::Transport(e.to_string()))?;

        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn apply_url(&self, project_id: ProjectId, infra_id: InfraId) -> String {
        format!("{}/projects/{}/infras/{}/apply", self.base_url, project_id, infra_id)
    }
}

#[async_trait]
impl Provisioner for ProvisionerClient {
    async fn apply(
        &self,
        project_id: ProjectId,
        infra_id: InfraId,
        request: &ApplyRequest,
    ) -> Result<OperationHandle, ProvisionerError> {
        let url = self.apply_url(project_id, infra_id);
        debug!(%url, workspace_id = %request.workspace_id, "Sending apply request to provisioner");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProvisionerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProvisionerError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), %body, "Provisioner rejected apply request");
            return Err(ProvisionerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(OperationHandle::default());
        }

        serde_json::from_str(&body).map_err(|e| ProvisionerError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::InfraKind;
    use crate::domain::operation::{OperationType, OperationUid};
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> ApplyRequest {
        ApplyRequest {
            kind: InfraKind::EKS,
            values: json!({"machine_type": "t3.medium"}).as_object().cloned().unwrap(),
            operation_kind: OperationType::Update,
            workspace_id: "eks-4-9-ab12cd-0123456789abcdef0123".to_string(),
            operation_id: OperationUid::new("0123456789abcdef0123").unwrap(),
        }
    }

    fn client(url: String) -> ProvisionerClient {
        ProvisionerClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_apply_posts_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/projects/4/infras/9/apply")
            .match_body(Matcher::PartialJson(json!({
                "kind": "eks",
                "values": {"machine_type": "t3.medium"},
                "operation_kind": "update",
                "workspace_id": "eks-4-9-ab12cd-0123456789abcdef0123",
                "operation_id": "0123456789abcdef0123"
            })))
            .with_status(202)
            .with_header("content-type", "application/json")
            .with_body(r#"{"operation_id":"0123456789abcdef0123","status":"starting"}"#)
            .create_async()
            .await;

        let handle = client(server.url()).apply(ProjectId(4), InfraId(9), &request()).await.unwrap();

        assert_eq!(handle.operation_id, "0123456789abcdef0123");
        assert_eq!(handle.status, "starting");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_apply_accepts_empty_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/4/infras/9/apply")
            .with_status(204)
            .create_async()
            .await;

        let handle = client(format!("{}/", server.url()))
            .apply(ProjectId(4), InfraId(9), &request())
            .await
            .unwrap();
        assert_eq!(handle, OperationHandle::default());
    }

    #[tokio::test]
    async fn test_apply_surfaces_upstream_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/4/infras/9/apply")
            .with_status(404)
            .with_body("no such infra")
            .create_async()
            .await;

        let err = client(server.url()).apply(ProjectId(4), InfraId(9), &request()).await.unwrap_err();

        assert_eq!(
            err,
            ProvisionerError::Status {
                status: 404,
                body: "no such infra".to_string()
            }
        );
        assert_eq!(err.upstream_status(), Some(404));
    }

    #[tokio::test]
    async fn test_apply_transport_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let err = client("http://127.0.0.1:9".to_string())
            .apply(ProjectId(4), InfraId(9), &request())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionerError::Transport(_)));
    }

    #[tokio::test]
    async fn test_apply_rejects_garbage_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/4/infras/9/apply")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = client(server.url()).apply(ProjectId(4), InfraId(9), &request()).await.unwrap_err();
        assert!(matches!(err, ProvisionerError::Decode(_)));
    }
}
