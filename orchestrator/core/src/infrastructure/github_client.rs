// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! GitHub Workflow Dispatch Client
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Trigger `workflow_dispatch` runs for preview deployments
//! - **Integration:** Orchestrator → `POST {api}/repos/{owner}/{repo}/actions/workflows/{file}/dispatches`

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::workflow_dispatch::{WorkflowDispatch, WorkflowDispatchError, WorkflowDispatcher};

const USER_AGENT: &str = "infra-orchestrator";

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

pub struct GithubWorkflowClient {
    api_base: String,
    token: String,
    client: Client,
}

impl GithubWorkflowClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WorkflowDispatcher for GithubWorkflowClient {
    async fn dispatch_workflow(&self, dispatch: &WorkflowDispatch) -> Result<(), WorkflowDispatchError> {
        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            self.api_base, dispatch.owner, dispatch.repo, dispatch.workflow_file
        );
        debug!(%url, git_ref = %dispatch.git_ref, "Dispatching workflow");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&DispatchBody {
                git_ref: &dispatch.git_ref,
                inputs: &dispatch.inputs,
            })
            .send()
            .await
            .map_err(|e| WorkflowDispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::NOT_FOUND {
            return Err(WorkflowDispatchError::NotFound);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "Workflow dispatch failed");
        Err(WorkflowDispatchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn dispatch() -> WorkflowDispatch {
        WorkflowDispatch {
            owner: "acme".to_string(),
            repo: "shop".to_string(),
            workflow_file: "porter_preview_env.yml".to_string(),
            git_ref: "feature/cart".to_string(),
            inputs: BTreeMap::from([
                ("pr_number".to_string(), "42".to_string()),
                ("pr_title".to_string(), "Add cart".to_string()),
            ]),
        }
    }

    #[tokio::test]
    async fn test_dispatch_workflow() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/shop/actions/workflows/porter_preview_env.yml/dispatches")
            .match_header("authorization", "Bearer gh-token")
            .match_body(Matcher::Json(json!({
                "ref": "feature/cart",
                "inputs": {"pr_number": "42", "pr_title": "Add cart"}
            })))
            .with_status(204)
            .create_async()
            .await;

        GithubWorkflowClient::new(server.url(), "gh-token")
            .dispatch_workflow(&dispatch())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_workflow_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = GithubWorkflowClient::new(server.url(), "gh-token")
            .dispatch_workflow(&dispatch())
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowDispatchError::NotFound);
    }

    #[tokio::test]
    async fn test_other_failures_keep_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(422)
            .with_body("bad ref")
            .create_async()
            .await;

        let err = GithubWorkflowClient::new(server.url(), "gh-token")
            .dispatch_workflow(&dispatch())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowDispatchError::Status {
                status: 422,
                body: "bad ref".to_string()
            }
        );
    }
}
