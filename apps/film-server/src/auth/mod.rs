// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Self-issued JWT access tokens, server-side refresh tokens and
//! per-resource permission grants.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in at `/v1/auth/*` and receives an access
//!    token (HS256 JWT, ~1 hour) and a refresh token (opaque, ~48 hours)
//! 2. Client sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Verifies signature and expiry (no store lookup)
//!    - Extracts `sub` → canonical `user_id`
//!    - For routes on a single resource, checks the caller's grant for the
//!      route's `(resource type, action)` on that resource
//! 4. Client trades the refresh token at `/v1/auth/refresh` for a new
//!    access token, and revokes it at `/v1/auth/logout`
//!
//! ## Security
//!
//! - All endpoints outside the public allow-list require authentication
//! - Permission checks are deny-by-default
//! - Only the SHA-256 hash of a refresh token is stored
//! - Passwords are hashed with Argon2id
//! - No clock skew leeway on access token expiry

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod refresh;
pub mod service;
pub mod token;

pub use claims::{AccessClaims, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::Auth;
pub use middleware::{require_auth, require_permission, PermissionGate};
pub use permissions::{Action, PermissionCode, PermissionGrant, PermissionRegistry, ResourceType};
pub use refresh::{RawRefreshToken, RefreshTokenLedger};
pub use service::{AccessGrant, AuthService, RegisterInput, SessionTokens};
pub use token::AccessTokenCodec;
