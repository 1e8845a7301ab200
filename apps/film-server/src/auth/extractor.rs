// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::token::AccessTokenCodec;
use super::{AuthError, AuthenticatedUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated)?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(token)
}

/// Resolve the caller from request headers.
pub fn authenticate(
    codec: &AccessTokenCodec,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = codec.decode(token)?;
    AuthenticatedUser::from_claims(&claims).ok_or(AuthError::Unauthenticated)
}

/// Extractor for authenticated users.
///
/// Reuses the identity attached by `require_auth` when present, otherwise
/// verifies the bearer token itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_films(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<FilmPage>, ApiError> {
///     // user.user_id is the caller's identity id
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = authenticate(&state.codec, &parts.headers)?;
        Ok(Auth(user))
    }
}
