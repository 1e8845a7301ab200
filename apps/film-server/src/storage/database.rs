// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `identities`: user_id → serialized Identity
//! - `identity_emails`: lowercase email → user_id
//! - `identity_usernames`: lowercase username → user_id
//! - `refresh_tokens`: SHA-256 token hash → serialized RefreshTokenRecord
//! - `permission_codes`: canonical code (`film:read`) → registration timestamp
//! - `user_permissions`: `user_id|code|resource_id` → grant timestamp
//! - `resource_permissions`: `resource_id|user_id|code` → grant timestamp
//! - `films`: film_id → serialized Film
//! - `collections`: collection_id → serialized Collection
//!
//! Every mutation runs inside a single redb write transaction. redb serializes
//! writers, so a transaction either lands completely or not at all.

use std::path::Path;
use std::time::Duration;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

pub(crate) const IDENTITY_EMAILS: TableDefinition<&str, &str> =
    TableDefinition::new("identity_emails");

pub(crate) const IDENTITY_USERNAMES: TableDefinition<&str, &str> =
    TableDefinition::new("identity_usernames");

pub(crate) const REFRESH_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("refresh_tokens");

pub(crate) const PERMISSION_CODES: TableDefinition<&str, i64> =
    TableDefinition::new("permission_codes");

/// Key format: `user_id|code|resource_id`, scanned by user prefix.
pub(crate) const USER_PERMISSIONS: TableDefinition<&str, i64> =
    TableDefinition::new("user_permissions");

/// Key format: `resource_id|user_id|code`, scanned when a resource is deleted.
pub(crate) const RESOURCE_PERMISSIONS: TableDefinition<&str, i64> =
    TableDefinition::new("resource_permissions");

pub(crate) const FILMS: TableDefinition<&str, &[u8]> = TableDefinition::new("films");

pub(crate) const COLLECTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("store call exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Join key parts with the `|` separator used by the composite-key tables.
pub(crate) fn composite_key(parts: &[&str]) -> String {
    parts.join("|")
}

/// Half-open key range covering every composite key that starts with `prefix|`.
pub(crate) fn prefix_range(prefix: &str) -> (String, String) {
    let start = format!("{prefix}|");
    // '}' sorts directly after '|'
    let end = format!("{prefix}}}");
    (start, end)
}

/// Read and deserialize a JSON row.
pub(crate) fn get_json<T, R>(table: &R, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

// =============================================================================
// CredentialDb
// =============================================================================

/// Embedded ACID database holding identities, tokens, grants and resources.
pub struct CredentialDb {
    db: Database,
}

impl CredentialDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(IDENTITY_EMAILS)?;
            let _ = write_txn.open_table(IDENTITY_USERNAMES)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(PERMISSION_CODES)?;
            let _ = write_txn.open_table(USER_PERMISSIONS)?;
            let _ = write_txn.open_table(RESOURCE_PERMISSIONS)?;
            let _ = write_txn.open_table(FILMS)?;
            let _ = write_txn.open_table(COLLECTIONS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Credential database opened");

        Ok(Self { db })
    }

    pub(crate) fn inner(&self) -> &Database {
        &self.db
    }

    /// Cheap round-trip used by the readiness probe.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(PERMISSION_CODES)?;
        Ok(())
    }
}
