// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb file (`credentials.redb` under
//! `DATA_DIR`): identities, refresh token records, permission codes and
//! grants, films and collections.
//!
//! ## Layout
//!
//! - `database` - table definitions, `StoreError`, `CredentialDb`
//! - `repository` - one synchronous repository per entity
//!
//! Rows are JSON-encoded. Secondary index tables (emails, usernames, grants
//! by user, grants by resource) are maintained in the same write transaction
//! as the row they index.

pub mod database;
pub mod repository;

pub use database::{CredentialDb, StoreError, StoreResult};
pub use repository::{
    Collection, CollectionRepository, Film, FilmRepository, Identity, IdentityRepository,
    PermissionRepository, RefreshTokenRecord, RefreshTokenRepository,
};
