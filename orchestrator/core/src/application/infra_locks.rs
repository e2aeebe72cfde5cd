// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-infra async locks for single-flight lifecycle requests.
//!
//! Only serializes requests inside one process. Entries are never evicted;
//! the map grows with the number of distinct infras touched.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::infra::InfraId;

#[derive(Debug, Default)]
pub struct InfraLocks {
    locks: DashMap<InfraId, Arc<Mutex<()>>>,
}

impl InfraLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `infra_id`. The lock is released when the
    /// guard is dropped.
    pub async fn acquire(&self, infra_id: InfraId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held across the await.
        let lock = self.locks.entry(infra_id).or_default().clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
