// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission code catalog and per-resource grants.
//!
//! Grants are written to two tables: `user_permissions` answers "what can
//! this user do" and `resource_permissions` lets a resource delete cascade
//! to every grant that references it.

use std::collections::BTreeSet;

use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use uuid::Uuid;

use super::super::database::{
    composite_key, prefix_range, CredentialDb, StoreError, StoreResult, PERMISSION_CODES,
    RESOURCE_PERMISSIONS, USER_PERMISSIONS,
};
use crate::auth::permissions::{PermissionCode, PermissionGrant};

fn user_key(grant: &PermissionGrant) -> String {
    composite_key(&[
        &grant.user_id.to_string(),
        &grant.code.code(),
        &grant.resource_id.to_string(),
    ])
}

fn resource_key(grant: &PermissionGrant) -> String {
    composite_key(&[
        &grant.resource_id.to_string(),
        &grant.user_id.to_string(),
        &grant.code.code(),
    ])
}

/// Parse a `user_permissions` key back into a grant.
fn grant_from_user_key(key: &str) -> Option<PermissionGrant> {
    let mut parts = key.split('|');
    let user_id = Uuid::parse_str(parts.next()?).ok()?;
    let code = PermissionCode::parse(parts.next()?)?;
    let resource_id = Uuid::parse_str(parts.next()?).ok()?;
    Some(PermissionGrant {
        user_id,
        code,
        resource_id,
    })
}

/// Parse a `resource_permissions` key back into a grant.
fn grant_from_resource_key(key: &str) -> Option<PermissionGrant> {
    let mut parts = key.split('|');
    let resource_id = Uuid::parse_str(parts.next()?).ok()?;
    let user_id = Uuid::parse_str(parts.next()?).ok()?;
    let code = PermissionCode::parse(parts.next()?)?;
    Some(PermissionGrant {
        user_id,
        code,
        resource_id,
    })
}

/// Register a permission code inside an open write transaction.
///
/// Existing codes keep their original registration timestamp.
pub(crate) fn write_code_if_absent(
    write_txn: &WriteTransaction,
    code: PermissionCode,
) -> StoreResult<()> {
    let mut codes = write_txn.open_table(PERMISSION_CODES)?;
    let key = code.code();
    if codes.get(key.as_str())?.is_none() {
        codes.insert(key.as_str(), Utc::now().timestamp())?;
    }
    Ok(())
}

/// Write grants inside an open write transaction.
///
/// Every referenced code must already be registered.
pub(crate) fn write_grants(
    write_txn: &WriteTransaction,
    grants: &[PermissionGrant],
) -> StoreResult<()> {
    let codes = write_txn.open_table(PERMISSION_CODES)?;
    let mut by_user = write_txn.open_table(USER_PERMISSIONS)?;
    let mut by_resource = write_txn.open_table(RESOURCE_PERMISSIONS)?;
    let now = Utc::now().timestamp();

    for grant in grants {
        let code = grant.code.code();
        if codes.get(code.as_str())?.is_none() {
            return Err(StoreError::NotFound(format!("Permission code {code}")));
        }
        by_user.insert(user_key(grant).as_str(), now)?;
        by_resource.insert(resource_key(grant).as_str(), now)?;
    }
    Ok(())
}

/// Remove every grant that references `resource_id` inside an open write
/// transaction. Returns the number of grants removed.
pub(crate) fn remove_resource_grants(
    write_txn: &WriteTransaction,
    resource_id: Uuid,
) -> StoreResult<usize> {
    let mut by_resource = write_txn.open_table(RESOURCE_PERMISSIONS)?;
    let (start, end) = prefix_range(&resource_id.to_string());

    let mut grants = Vec::new();
    for entry in by_resource.range(start.as_str()..end.as_str())? {
        let (key, _) = entry?;
        if let Some(grant) = grant_from_resource_key(key.value()) {
            grants.push(grant);
        }
    }

    let mut by_user = write_txn.open_table(USER_PERMISSIONS)?;
    for grant in &grants {
        by_resource.remove(resource_key(grant).as_str())?;
        by_user.remove(user_key(grant).as_str())?;
    }
    Ok(grants.len())
}

/// Repository for permission codes and grants.
pub struct PermissionRepository<'a> {
    db: &'a CredentialDb,
}

impl<'a> PermissionRepository<'a> {
    pub fn new(db: &'a CredentialDb) -> Self {
        Self { db }
    }

    /// Register a permission code. Idempotent.
    pub fn insert_code_if_absent(&self, code: PermissionCode) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        write_code_if_absent(&write_txn, code)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Whether the code is in the catalog.
    #[cfg(test)]
    pub fn code_exists(&self, code: PermissionCode) -> StoreResult<bool> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(PERMISSION_CODES)?;
        let exists = table.get(code.code().as_str())?.is_some();
        Ok(exists)
    }

    /// Link a user to a registered permission code for one resource.
    ///
    /// Re-granting an existing grant is a no-op.
    pub fn insert_user_permission(&self, grant: &PermissionGrant) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        write_grants(&write_txn, std::slice::from_ref(grant))?;
        write_txn.commit()?;
        Ok(())
    }

    /// Whether the exact grant exists.
    pub fn has_user_permission(&self, grant: &PermissionGrant) -> StoreResult<bool> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(USER_PERMISSIONS)?;
        let exists = table.get(user_key(grant).as_str())?.is_some();
        Ok(exists)
    }

    /// Every grant held by a user.
    pub fn permission_codes_for(&self, user_id: Uuid) -> StoreResult<BTreeSet<PermissionGrant>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(USER_PERMISSIONS)?;
        let (start, end) = prefix_range(&user_id.to_string());

        let mut grants = BTreeSet::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (key, _) = entry?;
            match grant_from_user_key(key.value()) {
                Some(grant) => {
                    grants.insert(grant);
                }
                None => {
                    tracing::warn!(key = key.value(), "Skipping malformed permission grant key");
                }
            }
        }
        Ok(grants)
    }
}
