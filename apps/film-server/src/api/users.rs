// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use super::extract::AppJson;
use crate::{
    auth::Auth,
    error::{ApiError, ErrorBody},
    models::{UpdateUserRequest, UserResponse},
    state::AppState,
};

/// Get the current authenticated user's identity.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token", body = ErrorBody),
    )
)]
pub async fn get_current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let identity = state.auth.identity(user.user_id).await?;
    Ok(Json(UserResponse::from(&identity)))
}

/// Change the current user's username and/or email.
#[utoipa::path(
    patch,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user information", body = UserResponse),
        (status = 400, description = "Invalid username or email", body = ErrorBody),
        (status = 401, description = "Unauthorized - invalid or missing token", body = ErrorBody),
        (status = 409, description = "Username or email already taken", body = ErrorBody),
    )
)]
pub async fn update_current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let identity = state
        .auth
        .update_identity(user.user_id, request.username, request.email)
        .await?;
    Ok(Json(UserResponse::from(&identity)))
}
