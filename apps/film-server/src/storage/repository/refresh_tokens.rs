// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token rows, keyed by the SHA-256 hash of the raw token.
//!
//! Rows are never deleted. Revocation flips a flag and the row stays behind
//! as an audit record.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{get_json, CredentialDb, StoreError, StoreResult, REFRESH_TOKENS};

/// A persisted refresh token. The raw token is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Valid iff not revoked and `now < expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Repository for refresh token rows.
pub struct RefreshTokenRepository<'a> {
    db: &'a CredentialDb,
}

impl<'a> RefreshTokenRepository<'a> {
    pub fn new(db: &'a CredentialDb) -> Self {
        Self { db }
    }

    /// Persist a freshly issued token.
    pub fn insert(&self, record: &RefreshTokenRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(REFRESH_TOKENS)?;
            if table.get(record.token_hash.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists("refresh token".to_string()));
            }
            table.insert(record.token_hash.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a token by hash.
    pub fn find(&self, token_hash: &str) -> StoreResult<RefreshTokenRecord> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(REFRESH_TOKENS)?;
        get_json(&table, token_hash)?
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }

    /// Flip the revoked flag. Revoking an already-revoked token succeeds and
    /// keeps the original revocation time.
    pub fn mark_revoked(&self, token_hash: &str) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(REFRESH_TOKENS)?;
            let mut record: RefreshTokenRecord = get_json(&table, token_hash)?
                .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;

            if !record.revoked {
                record.revoked = true;
                record.revoked_at = Some(Utc::now());
                let json = serde_json::to_vec(&record)?;
                table.insert(token_hash, json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_db() -> (CredentialDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = CredentialDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample_record(hash: &str) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            token_hash: hash.to_string(),
            user_id: Uuid::new_v4(),
            issued_at: now,
            expires_at: now + Duration::hours(48),
            revoked: false,
            revoked_at: None,
        }
    }

    #[test]
    fn insert_and_find() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        let record = sample_record("hash-1");

        repo.insert(&record).unwrap();
        assert_eq!(repo.find("hash-1").unwrap(), record);
        assert!(matches!(repo.find("hash-2"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn revoke_is_idempotent_and_keeps_row() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        repo.insert(&sample_record("hash-1")).unwrap();

        repo.mark_revoked("hash-1").unwrap();
        let first = repo.find("hash-1").unwrap();
        assert!(first.revoked);

        repo.mark_revoked("hash-1").unwrap();
        let second = repo.find("hash-1").unwrap();
        assert_eq!(first.revoked_at, second.revoked_at);
    }

    #[test]
    fn revoke_unknown_token_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = RefreshTokenRepository::new(&db);
        assert!(matches!(repo.mark_revoked("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn validity_depends_on_flag_and_expiry() {
        let now = Utc::now();
        let mut record = sample_record("hash");
        assert!(record.is_valid_at(now));

        record.expires_at = now;
        assert!(!record.is_valid_at(now));

        record.expires_at = now + Duration::seconds(1);
        record.revoked = true;
        assert!(!record.is_valid_at(now));
    }
}
