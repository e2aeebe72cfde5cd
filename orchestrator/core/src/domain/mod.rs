// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model of the infra orchestrator.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities, value objects, state machine and the ports the
//!   application layer drives

pub mod cluster;
pub mod credentials;
pub mod crypto;
pub mod environment;
pub mod events;
pub mod infra;
pub mod kind;
pub mod lifecycle;
pub mod operation;
pub mod orchestrator_config;
pub mod provisioner;
pub mod repository;
pub mod workflow_dispatch;
pub mod workspace_id;
