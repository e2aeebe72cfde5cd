// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trigger Deployment Workflow Use Case
//!
//! Re-runs the preview environment workflow for a pull-request deployment by
//! dispatching `porter_{environment}_env.yml` on the PR's head branch.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Resolve deployment + environment, dispatch the workflow
//! - **Collaborators:**
//!   - Domain: Deployment, Environment
//!   - Infrastructure: EnvironmentRepository, WorkflowDispatcher, EventBus

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::error::OrchestratorError;
use crate::domain::environment::DeploymentId;
use crate::domain::events::DeploymentEvent;
use crate::domain::infra::{ClusterId, ProjectId};
use crate::domain::repository::EnvironmentRepository;
use crate::domain::workflow_dispatch::{WorkflowDispatch, WorkflowDispatchError, WorkflowDispatcher};
use crate::infrastructure::event_bus::EventBus;

#[async_trait]
pub trait DeploymentTriggerUseCase: Send + Sync {
    /// Dispatch the environment workflow for a deployment. Inactive
    /// deployments are a silent no-op.
    ///
    /// # Errors
    ///
    /// - NotFound: deployment or environment missing in the cluster
    /// - PassThrough(404): the repository has no workflow file for the environment
    /// - Internal: any other git host failure
    async fn trigger(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        deployment_id: DeploymentId,
    ) -> Result<(), OrchestratorError>;
}

pub struct StandardDeploymentTrigger {
    environments: Arc<dyn EnvironmentRepository>,
    dispatcher: Arc<dyn WorkflowDispatcher>,
    event_bus: Arc<EventBus>,
}

impl StandardDeploymentTrigger {
    pub fn new(
        environments: Arc<dyn EnvironmentRepository>,
        dispatcher: Arc<dyn WorkflowDispatcher>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            environments,
            dispatcher,
            event_bus,
        }
    }
}

#[async_trait]
impl DeploymentTriggerUseCase for StandardDeploymentTrigger {
    async fn trigger(
        &self,
        project_id: ProjectId,
        cluster_id: ClusterId,
        deployment_id: DeploymentId,
    ) -> Result<(), OrchestratorError> {
        let deployment = self
            .environments
            .read_deployment_by_id(project_id, cluster_id, deployment_id)
            .await?;

        if deployment.is_inactive() {
            debug!(%deployment_id, "Deployment is inactive, not dispatching workflow");
            self.event_bus.publish_deployment_event(DeploymentEvent::WorkflowSkipped {
                deployment_id,
                skipped_at: Utc::now(),
            });
            return Ok(());
        }

        let environment = self
            .environments
            .read_environment_by_id(project_id, cluster_id, deployment.environment_id)
            .await?;

        let inputs = BTreeMap::from([
            ("pr_number".to_string(), deployment.pull_request_id.to_string()),
            ("pr_title".to_string(), deployment.pr_name.clone()),
            ("pr_branch_from".to_string(), deployment.pr_branch_from.clone()),
            ("pr_branch_into".to_string(), deployment.pr_branch_into.clone()),
        ]);

        let dispatch = WorkflowDispatch {
            owner: environment.git_repo_owner.clone(),
            repo: environment.git_repo_name.clone(),
            workflow_file: environment.workflow_file_name(),
            git_ref: deployment.pr_branch_from.clone(),
            inputs,
        };

        match self.dispatcher.dispatch_workflow(&dispatch).await {
            Ok(()) => {
                let repo = format!("{}/{}", dispatch.owner, dispatch.repo);
                info!(
                    %deployment_id,
                    %repo,
                    workflow = %dispatch.workflow_file,
                    git_ref = %dispatch.git_ref,
                    "Dispatched deployment workflow"
                );
                self.event_bus.publish_deployment_event(DeploymentEvent::WorkflowDispatched {
                    deployment_id,
                    workflow_file: dispatch.workflow_file,
                    git_ref: dispatch.git_ref,
                    dispatched_at: Utc::now(),
                });
                Ok(())
            }
            Err(WorkflowDispatchError::NotFound) => {
                warn!(%deployment_id, workflow = %dispatch.workflow_file, "Workflow file not found");
                Err(OrchestratorError::PassThrough {
                    status: 404,
                    message: "workflow file not found".to_string(),
                })
            }
            Err(e) => {
                warn!(%deployment_id, error = %e, "Workflow dispatch failed");
                Err(OrchestratorError::Internal(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::environment::{Deployment, DeploymentStatus, Environment, EnvironmentId};
    use crate::infrastructure::repositories::InMemoryEnvironmentRepository;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        calls: Mutex<Vec<WorkflowDispatch>>,
        fail_with: Option<WorkflowDispatchError>,
    }

    #[async_trait]
    impl WorkflowDispatcher for RecordingDispatcher {
        async fn dispatch_workflow(&self, dispatch: &WorkflowDispatch) -> Result<(), WorkflowDispatchError> {
            self.calls.lock().push(dispatch.clone());
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn fixtures(status: DeploymentStatus) -> Arc<InMemoryEnvironmentRepository> {
        let repo = InMemoryEnvironmentRepository::new();
        repo.insert_environment(Environment {
            id: EnvironmentId(3),
            project_id: ProjectId(1),
            cluster_id: ClusterId(2),
            name: "preview".to_string(),
            git_repo_owner: "porter-dev".to_string(),
            git_repo_name: "web".to_string(),
        });
        repo.insert_deployment(Deployment {
            id: DeploymentId(8),
            environment_id: EnvironmentId(3),
            status,
            pull_request_id: 42,
            pr_name: "Add billing page".to_string(),
            pr_branch_from: "feature/billing".to_string(),
            pr_branch_into: "main".to_string(),
        });
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_dispatches_environment_workflow() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let trigger = StandardDeploymentTrigger::new(
            fixtures(DeploymentStatus::Created),
            dispatcher.clone(),
            Arc::new(EventBus::default()),
        );

        trigger.trigger(ProjectId(1), ClusterId(2), DeploymentId(8)).await.unwrap();

        let calls = dispatcher.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].workflow_file, "porter_preview_env.yml");
        assert_eq!(calls[0].git_ref, "feature/billing");
        assert_eq!(calls[0].owner, "porter-dev");
        assert_eq!(calls[0].inputs["pr_number"], "42");
        assert_eq!(calls[0].inputs["pr_title"], "Add billing page");
        assert_eq!(calls[0].inputs["pr_branch_into"], "main");
    }

    #[tokio::test]
    async fn test_inactive_deployment_is_noop() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let trigger = StandardDeploymentTrigger::new(
            fixtures(DeploymentStatus::Inactive),
            dispatcher.clone(),
            Arc::new(EventBus::default()),
        );

        trigger.trigger(ProjectId(1), ClusterId(2), DeploymentId(8)).await.unwrap();
        assert!(dispatcher.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_workflow_passes_through_404() {
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_with: Some(WorkflowDispatchError::NotFound),
            ..Default::default()
        });
        let trigger =
            StandardDeploymentTrigger::new(fixtures(DeploymentStatus::Created), dispatcher, Arc::new(EventBus::default()));

        let err = trigger.trigger(ProjectId(1), ClusterId(2), DeploymentId(8)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "workflow file not found");
    }

    #[tokio::test]
    async fn test_other_failures_are_internal() {
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_with: Some(WorkflowDispatchError::Status {
                status: 422,
                body: "Unexpected inputs".to_string(),
            }),
            ..Default::default()
        });
        let trigger =
            StandardDeploymentTrigger::new(fixtures(DeploymentStatus::Created), dispatcher, Arc::new(EventBus::default()));

        let err = trigger.trigger(ProjectId(1), ClusterId(2), DeploymentId(8)).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unknown_deployment_is_not_found() {
        let trigger = StandardDeploymentTrigger::new(
            fixtures(DeploymentStatus::Created),
            Arc::new(RecordingDispatcher::default()),
            Arc::new(EventBus::default()),
        );

        let err = trigger.trigger(ProjectId(1), ClusterId(2), DeploymentId(99)).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound(_)));
    }
}
