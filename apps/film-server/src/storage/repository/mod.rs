// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the credential database.
//!
//! Each repository borrows the `CredentialDb` and exposes the operations for
//! one entity type. Repositories are synchronous; async callers go through
//! `CredentialStore::call`.

pub mod collections;
pub mod films;
pub mod identities;
pub mod permissions;
pub mod refresh_tokens;

pub use collections::{Collection, CollectionRepository};
pub use films::{Film, FilmRepository};
pub use identities::{Identity, IdentityRepository};
pub use permissions::PermissionRepository;
pub use refresh_tokens::{RefreshTokenRecord, RefreshTokenRepository};
