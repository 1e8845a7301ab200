// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Film Tracker - film and collection tracking service
//!
//! An HTTP API for recording films and grouping them into collections.
//! Callers authenticate with short-lived JWT access tokens and opaque
//! server-side refresh tokens; every film and collection is guarded by
//! per-resource permission grants.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Credentials, tokens and the permission registry
//! - `storage` - Embedded redb database and repositories
//! - `store` - Async facade over the database with a per-call deadline

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
