// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! The core returns these as values. Status codes and response bodies are
//! chosen only at the HTTP boundary (`crate::error::ApiError`).

use crate::storage::StoreError;

/// Error taxonomy shared by the auth core and the resource handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Malformed request data.
    #[error("{0}")]
    InvalidInput(String),

    /// Unique constraint violation, e.g. a taken email.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// No matching record.
    #[error("{0} not found")]
    NotFound(String),

    /// Login mismatch. Identical for unknown identity and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, garbled or expired access token.
    #[error("Authentication required")]
    Unauthenticated,

    /// Valid identity without the required permission.
    #[error("Insufficient permissions for this resource")]
    Forbidden,

    /// Refresh token malformed, unknown, expired or revoked.
    #[error("Invalid or expired refresh token")]
    InvalidToken,

    /// Store failure, signing failure or deadline exceeded.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for the JSON envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::AlreadyExists(_) => "already_exists",
            AuthError::NotFound(_) => "not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden => "forbidden",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AuthError::NotFound(what),
            StoreError::AlreadyExists(what) => AuthError::AlreadyExists(what),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
