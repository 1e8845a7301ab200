// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AccessTokenCodec, AuthService, PermissionRegistry};
use crate::config::AuthSettings;
use crate::store::CredentialStore;

/// Shared per-process state. Cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub store: CredentialStore,
    pub auth: AuthService,
    pub codec: Arc<AccessTokenCodec>,
    pub permissions: PermissionRegistry,
}

impl AppState {
    pub fn new(store: CredentialStore, settings: AuthSettings) -> Self {
        let codec = Arc::new(AccessTokenCodec::new(&settings.jwt_secret));
        Self {
            auth: AuthService::new(store.clone(), Arc::clone(&codec), settings),
            permissions: PermissionRegistry::new(store.clone()),
            codec,
            store,
        }
    }

    /// State over a throwaway database. Keep the `TempDir` alive for the
    /// duration of the test.
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use std::time::Duration;

        let dir = tempfile::tempdir().expect("create temp dir");
        let store = CredentialStore::open(
            &dir.path().join("test.redb"),
            crate::store::DEFAULT_STORE_TIMEOUT,
        )
        .expect("open test store");
        let settings = AuthSettings::new(
            b"state-test-secret-0123456789abcdefgh".to_vec(),
            Duration::from_secs(3600),
            Duration::from_secs(48 * 3600),
        )
        .expect("valid test settings");
        (Self::new(store, settings), dir)
    }
}
