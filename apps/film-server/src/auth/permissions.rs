// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-resource permission model.
//!
//! A permission code is a typed `(ResourceType, Action)` pair. Its canonical
//! string form (`film:read`) is only used as a storage key. A grant links one
//! user to one code for one resource id. Checks are deny-by-default: the
//! absence of a grant means no access.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AuthError;
use crate::storage::PermissionRepository;
use crate::store::CredentialStore;

/// Kinds of protected resources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Film,
    Collection,
}

impl ResourceType {
    pub const ALL: [ResourceType; 2] = [ResourceType::Film, ResourceType::Collection];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Film => "film",
            ResourceType::Collection => "collection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "film" => Some(ResourceType::Film),
            "collection" => Some(ResourceType::Collection),
            _ => None,
        }
    }
}

/// Actions that can be granted on a resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    /// Actions granted to the creator of a resource.
    pub const OWNER_TRIAD: [Action; 3] = [Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Action::Read),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

/// A `(resource type, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionCode {
    pub resource_type: ResourceType,
    pub action: Action,
}

impl PermissionCode {
    pub const fn new(resource_type: ResourceType, action: Action) -> Self {
        Self {
            resource_type,
            action,
        }
    }

    /// Canonical storage form, e.g. `film:read`.
    pub fn code(&self) -> String {
        format!("{}:{}", self.resource_type.as_str(), self.action.as_str())
    }

    /// Parse the canonical storage form.
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':')?;
        Some(Self::new(ResourceType::parse(resource)?, Action::parse(action)?))
    }

    /// Every code the service knows about.
    pub fn catalog() -> impl Iterator<Item = PermissionCode> {
        ResourceType::ALL.into_iter().flat_map(|resource_type| {
            Action::OWNER_TRIAD
                .into_iter()
                .map(move |action| PermissionCode::new(resource_type, action))
        })
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type.as_str(), self.action.as_str())
    }
}

/// One user holding one code on one resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionGrant {
    pub user_id: Uuid,
    pub code: PermissionCode,
    pub resource_id: Uuid,
}

impl PermissionGrant {
    pub fn new(user_id: Uuid, code: PermissionCode, resource_id: Uuid) -> Self {
        Self {
            user_id,
            code,
            resource_id,
        }
    }

    /// The read/update/delete grants issued to a resource's creator.
    pub fn owner_triad(
        user_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> Vec<PermissionGrant> {
        Action::OWNER_TRIAD
            .into_iter()
            .map(|action| {
                PermissionGrant::new(
                    user_id,
                    PermissionCode::new(resource_type, action),
                    resource_id,
                )
            })
            .collect()
    }
}

/// Defines codes, issues grants and answers permission checks.
#[derive(Clone)]
pub struct PermissionRegistry {
    store: CredentialStore,
}

impl PermissionRegistry {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Register a code if it is not already in the catalog.
    pub async fn ensure_code(&self, code: PermissionCode) -> Result<(), AuthError> {
        self.store
            .call(move |db| PermissionRepository::new(db).insert_code_if_absent(code))
            .await?;
        Ok(())
    }

    /// Register every known code. Run once at startup.
    pub async fn ensure_catalog(&self) -> Result<(), AuthError> {
        for code in PermissionCode::catalog() {
            self.ensure_code(code).await?;
        }
        Ok(())
    }

    /// Grant one code on one resource.
    ///
    /// The code is registered first if needed. Any failure here is
    /// `Internal`: the resource being protected already exists.
    pub async fn grant(
        &self,
        user_id: Uuid,
        code: PermissionCode,
        resource_id: Uuid,
    ) -> Result<(), AuthError> {
        let grant = PermissionGrant::new(user_id, code, resource_id);
        self.store
            .call(move |db| {
                let repo = PermissionRepository::new(db);
                repo.insert_code_if_absent(grant.code)?;
                repo.insert_user_permission(&grant)
            })
            .await
            .map_err(|e| AuthError::Internal(format!("grant {code} on {resource_id}: {e}")))
    }

    /// Whether `user_id` holds `code` on `resource_id`.
    pub async fn check(
        &self,
        user_id: Uuid,
        code: PermissionCode,
        resource_id: Uuid,
    ) -> Result<bool, AuthError> {
        let grant = PermissionGrant::new(user_id, code, resource_id);
        let allowed = self
            .store
            .call(move |db| PermissionRepository::new(db).has_user_permission(&grant))
            .await?;
        Ok(allowed)
    }

    /// `check`, with a denial turned into `Forbidden`.
    pub async fn require(
        &self,
        user_id: Uuid,
        code: PermissionCode,
        resource_id: Uuid,
    ) -> Result<(), AuthError> {
        if self.check(user_id, code, resource_id).await? {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Every grant held by a user.
    pub async fn codes_for(&self, user_id: Uuid) -> Result<BTreeSet<PermissionGrant>, AuthError> {
        let grants = self
            .store
            .call(move |db| PermissionRepository::new(db).permission_codes_for(user_id))
            .await?;
        Ok(grants)
    }

    /// Ids of the resources of one type the user may read.
    pub async fn readable(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Vec<Uuid>, AuthError> {
        let read = PermissionCode::new(resource_type, Action::Read);
        Ok(self
            .codes_for(user_id)
            .await?
            .into_iter()
            .filter(|grant| grant.code == read)
            .map(|grant| grant.resource_id)
            .collect())
    }
}
