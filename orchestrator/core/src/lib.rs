// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure lifecycle and operation orchestrator.
//!
//! Tracks tenant-owned cloud resources (clusters, registries, databases) as
//! infras with an append-only operation log, and delegates the provisioning
//! work itself to an external provisioner.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** `domain` holds entities and ports, `application` the use
//!   cases, `infrastructure` the adapters (storage, HTTP, crypto, events)

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
