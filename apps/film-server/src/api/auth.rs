// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public auth endpoints. None of these require an access token.

use axum::{extract::State, http::StatusCode, Json};

use super::extract::AppJson;
use crate::{
    auth::RegisterInput,
    error::{ApiError, ErrorBody},
    models::{
        AccessTokenResponse, AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest,
    },
    state::AppState,
};

/// Create an identity and open a session.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity created", body = AuthResponse),
        (status = 400, description = "Invalid username, email or password", body = ErrorBody),
        (status = 409, description = "Email or username already taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let session = state
        .auth
        .register(RegisterInput {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;

    tracing::info!(user_id = %session.identity.id, "Identity registered");
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Log in with an email or username.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .auth
        .login(&request.identifier, &request.password)
        .await?;
    Ok(Json(session.into()))
}

/// Trade a refresh token for a new access token.
///
/// The refresh token is not rotated and can be used again until it expires
/// or is revoked.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(request): AppJson<RefreshTokenRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let grant = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(grant.into()))
}

/// Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ErrorBody)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AppJson(request): AppJson<RefreshTokenRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&request.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
