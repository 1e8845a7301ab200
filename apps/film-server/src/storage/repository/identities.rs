// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity repository.
//!
//! Identities are keyed by user id, with unique secondary indexes on the
//! lowercased email and username.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{
    get_json, CredentialDb, StoreError, StoreResult, IDENTITIES, IDENTITY_EMAILS,
    IDENTITY_USERNAMES,
};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string. Never leaves the server.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Index key for a unique identity attribute.
fn index_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Repository for identity rows.
pub struct IdentityRepository<'a> {
    db: &'a CredentialDb,
}

impl<'a> IdentityRepository<'a> {
    pub fn new(db: &'a CredentialDb) -> Self {
        Self { db }
    }

    /// Insert a new identity.
    ///
    /// # Errors
    /// `StoreError::AlreadyExists` if the email or username is taken.
    pub fn insert(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Identity> {
        let identity = Identity {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        let id = identity.id.to_string();
        let email_key = index_key(email);
        let username_key = index_key(username);
        let json = serde_json::to_vec(&identity)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut emails = write_txn.open_table(IDENTITY_EMAILS)?;
            if emails.get(email_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(
                    "identity with this email".to_string(),
                ));
            }

            let mut usernames = write_txn.open_table(IDENTITY_USERNAMES)?;
            if usernames.get(username_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(
                    "identity with this username".to_string(),
                ));
            }

            emails.insert(email_key.as_str(), id.as_str())?;
            usernames.insert(username_key.as_str(), id.as_str())?;

            let mut identities = write_txn.open_table(IDENTITIES)?;
            identities.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;

        Ok(identity)
    }

    /// Get an identity by id.
    pub fn find_by_id(&self, user_id: Uuid) -> StoreResult<Identity> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(IDENTITIES)?;
        get_json(&table, &user_id.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("Identity {user_id}")))
    }

    /// Get an identity by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> StoreResult<Identity> {
        self.find_by_index(IndexKind::Email, email)
    }

    /// Get an identity by username (case-insensitive).
    pub fn find_by_username(&self, username: &str) -> StoreResult<Identity> {
        self.find_by_index(IndexKind::Username, username)
    }

    fn find_by_index(&self, kind: IndexKind, value: &str) -> StoreResult<Identity> {
        let key = index_key(value);
        let read_txn = self.db.inner().begin_read()?;

        let user_id = {
            let definition = match kind {
                IndexKind::Email => IDENTITY_EMAILS,
                IndexKind::Username => IDENTITY_USERNAMES,
            };
            let index = read_txn.open_table(definition)?;
            let found = index.get(key.as_str())?;
            match found {
                Some(id) => id.value().to_string(),
                None => return Err(StoreError::NotFound("Identity".to_string())),
            }
        };

        let table = read_txn.open_table(IDENTITIES)?;
        get_json(&table, &user_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Identity {user_id}")))
    }

    /// Change the username and/or email of an identity.
    ///
    /// Index entries move atomically with the row. Setting a value the
    /// identity already holds is a no-op for that attribute.
    pub fn update(
        &self,
        user_id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Identity> {
        let id = user_id.to_string();

        let write_txn = self.db.inner().begin_write()?;
        let identity = {
            let mut identities = write_txn.open_table(IDENTITIES)?;
            let mut identity: Identity = get_json(&identities, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("Identity {user_id}")))?;

            if let Some(new_email) = email {
                let mut emails = write_txn.open_table(IDENTITY_EMAILS)?;
                move_index_entry(&mut emails, &identity.email, new_email, &id, "email")?;
                identity.email = new_email.trim().to_string();
            }

            if let Some(new_username) = username {
                let mut usernames = write_txn.open_table(IDENTITY_USERNAMES)?;
                move_index_entry(&mut usernames, &identity.username, new_username, &id, "username")?;
                identity.username = new_username.trim().to_string();
            }

            let json = serde_json::to_vec(&identity)?;
            identities.insert(id.as_str(), json.as_slice())?;
            identity
        };
        write_txn.commit()?;

        Ok(identity)
    }
}

enum IndexKind {
    Email,
    Username,
}

/// Re-point a unique index from `old` to `new` for the given owner.
fn move_index_entry(
    index: &mut redb::Table<'_, &'static str, &'static str>,
    old: &str,
    new: &str,
    owner_id: &str,
    attribute: &str,
) -> StoreResult<()> {
    let old_key = index_key(old);
    let new_key = index_key(new);
    if old_key == new_key {
        return Ok(());
    }

    let holder = index.get(new_key.as_str())?.map(|v| v.value().to_string());
    if holder.is_some_and(|holder| holder != owner_id) {
        return Err(StoreError::AlreadyExists(format!(
            "identity with this {attribute}"
        )));
    }

    index.remove(old_key.as_str())?;
    index.insert(new_key.as_str(), owner_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (CredentialDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = CredentialDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn insert_and_find_by_every_key() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);

        let created = repo.insert("alice", "Alice@Example.com", "hash").unwrap();

        assert_eq!(repo.find_by_id(created.id).unwrap(), created);
        assert_eq!(repo.find_by_email("alice@example.com").unwrap(), created);
        assert_eq!(repo.find_by_username("ALICE").unwrap(), created);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);

        repo.insert("alice", "alice@example.com", "hash").unwrap();
        let result = repo.insert("alice2", "ALICE@example.com", "hash");
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn duplicate_username_is_rejected_without_partial_write() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);

        repo.insert("alice", "alice@example.com", "hash").unwrap();
        let result = repo.insert("Alice", "other@example.com", "hash");
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));

        // The aborted insert must not have claimed the email
        assert!(matches!(
            repo.find_by_email("other@example.com"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);

        assert!(matches!(repo.find_by_id(Uuid::new_v4()), Err(StoreError::NotFound(_))));
        assert!(matches!(repo.find_by_email("nobody@example.com"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_moves_index_entries() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);
        let created = repo.insert("alice", "alice@example.com", "hash").unwrap();

        let updated = repo
            .update(created.id, Some("alicia"), Some("alicia@example.com"))
            .unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.email, "alicia@example.com");

        assert!(repo.find_by_email("alice@example.com").is_err());
        assert_eq!(repo.find_by_email("alicia@example.com").unwrap().id, created.id);
        assert_eq!(repo.find_by_username("alicia").unwrap().id, created.id);

        // Old keys are free again
        repo.insert("alice", "alice@example.com", "hash").unwrap();
    }

    #[test]
    fn update_rejects_taken_email() {
        let (db, _dir) = temp_db();
        let repo = IdentityRepository::new(&db);
        let alice = repo.insert("alice", "alice@example.com", "hash").unwrap();
        repo.insert("bob", "bob@example.com", "hash").unwrap();

        let result = repo.update(alice.id, None, Some("bob@example.com"));
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
        assert_eq!(repo.find_by_id(alice.id).unwrap().email, "alice@example.com");
    }
}
