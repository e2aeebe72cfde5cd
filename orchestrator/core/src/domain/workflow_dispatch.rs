// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Git host workflow dispatch port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDispatch {
    pub owner: String,
    pub repo: String,
    pub workflow_file: String,
    pub git_ref: String,
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowDispatchError {
    /// Repository or workflow file does not exist.
    #[error("workflow not found")]
    NotFound,

    #[error("git host returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("git host transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    async fn dispatch_workflow(&self, dispatch: &WorkflowDispatch) -> Result<(), WorkflowDispatchError>;
}
