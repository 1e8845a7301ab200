// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware.
//!
//! Two layers cooperate:
//!
//! - `require_auth` wraps the whole router. It lets the public allow-list
//!   through, rejects everything else without a valid access token, and
//!   attaches the resolved `AuthenticatedUser` to the request extensions.
//! - `require_permission` is attached per route and method with
//!   `route_layer`. It reads `{id}` from the path and checks the caller holds
//!   the route's permission code on that resource.
//!
//! ```rust,ignore
//! let gate = PermissionGate::new(state.permissions.clone(), FILM_READ);
//! get(films::get_film).route_layer(from_fn_with_state(gate, require_permission))
//! ```

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::extractor::authenticate;
use super::permissions::{PermissionCode, PermissionRegistry};
use super::{AuthError, AuthenticatedUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Paths served without an access token.
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/health/live",
    "/health/ready",
    "/v1/auth/register",
    "/v1/auth/login",
    "/v1/auth/refresh",
    "/v1/auth/logout",
    "/api-doc/openapi.json",
];

/// Prefix of the Swagger UI assets.
const DOCS_PREFIX: &str = "/docs";

/// Path parameter holding the protected resource id.
const RESOURCE_ID_PARAM: &str = "id";

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
        || path == DOCS_PREFIX
        || path
            .strip_prefix(DOCS_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Authenticate every request outside the public allow-list.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let user = authenticate(&state.codec, request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// State for one permission-gated route.
#[derive(Clone)]
pub struct PermissionGate {
    pub permissions: PermissionRegistry,
    pub code: PermissionCode,
}

impl PermissionGate {
    pub fn new(permissions: PermissionRegistry, code: PermissionCode) -> Self {
        Self { permissions, code }
    }
}

/// Deny the request unless the caller holds the gate's code on `{id}`.
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AuthError::Unauthenticated)?;

    let raw_id = params.get(RESOURCE_ID_PARAM).ok_or_else(|| {
        AuthError::Internal(format!(
            "route gated by {} has no {{{RESOURCE_ID_PARAM}}} parameter",
            gate.code
        ))
    })?;
    let resource_id = Uuid::parse_str(raw_id)
        .map_err(|_| AuthError::InvalidInput(format!("invalid resource id: {raw_id}")))?;

    gate.permissions
        .require(user.user_id, gate.code, resource_id)
        .await?;
    Ok(next.run(request).await)
}
