// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Async handle to the credential database.
//!
//! redb is synchronous, so every call is moved onto the blocking pool and
//! bounded by a deadline. The handle is cheap to clone and shared across
//! request tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::{CredentialDb, StoreError, StoreResult};

/// Default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<CredentialDb>,
    timeout: Duration,
}

impl CredentialStore {
    pub fn new(db: CredentialDb, timeout: Duration) -> Self {
        Self {
            db: Arc::new(db),
            timeout,
        }
    }

    /// Open the database file and wrap it.
    pub fn open(path: &Path, timeout: Duration) -> StoreResult<Self> {
        Ok(Self::new(CredentialDb::open(path)?, timeout))
    }

    /// Run a repository closure on the blocking pool.
    ///
    /// # Errors
    /// Whatever the closure returns, `StoreError::Timeout` if the deadline
    /// elapses first, or `StoreError::Task` if the blocking task panicked.
    /// A timed-out closure keeps running to completion in the background;
    /// its result is discarded.
    pub async fn call<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&CredentialDb) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || f(&db));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::Task(join_err.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    /// Readiness round-trip.
    pub async fn ping(&self) -> StoreResult<()> {
        self.call(|db| db.ping()).await
    }
}
