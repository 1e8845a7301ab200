// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Film endpoints.
//!
//! Single-film routes are gated by `film:read`, `film:update` and
//! `film:delete` in the router; handlers here assume the check passed.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::{
    auth::{Auth, PermissionGrant, ResourceType},
    error::{ApiError, ErrorBody},
    models::{FilmPage, FilmRequest, PageQuery},
    state::AppState,
    storage::{Film, FilmRepository},
};

/// Create a film. The caller receives read, update and delete grants on it.
#[utoipa::path(
    post,
    path = "/v1/films",
    tag = "Films",
    security(("bearer" = [])),
    request_body = FilmRequest,
    responses(
        (status = 201, description = "Film created", body = Film),
        (status = 400, description = "Invalid film", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn create_film(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppJson(request): AppJson<FilmRequest>,
) -> Result<(StatusCode, Json<Film>), ApiError> {
    let film = request.validated()?.into_film(user.user_id);
    let grants = PermissionGrant::owner_triad(user.user_id, ResourceType::Film, film.id);

    let stored = film.clone();
    state
        .store
        .call(move |db| FilmRepository::new(db).create_with_grants(&stored, &grants))
        .await?;

    tracing::info!(film_id = %film.id, user_id = %user.user_id, "Film created");
    Ok((StatusCode::CREATED, Json(film)))
}

/// List the films the caller can read, newest first.
#[utoipa::path(
    get,
    path = "/v1/films",
    tag = "Films",
    security(("bearer" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of films", body = FilmPage),
        (status = 400, description = "Invalid pagination", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn list_films(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<FilmPage>, ApiError> {
    query.resolve()?;
    let ids = state
        .permissions
        .readable(user.user_id, ResourceType::Film)
        .await?;

    let mut films = state
        .store
        .call(move |db| FilmRepository::new(db).get_many(&ids))
        .await?;
    films.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    Ok(Json(query.paginate(films)?.into()))
}

/// Get a film.
#[utoipa::path(
    get,
    path = "/v1/films/{id}",
    tag = "Films",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Film ID")),
    responses(
        (status = 200, description = "Film", body = Film),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No read permission on this film", body = ErrorBody),
        (status = 404, description = "Film not found", body = ErrorBody)
    )
)]
pub async fn get_film(
    State(state): State<AppState>,
    AppPath(film_id): AppPath<Uuid>,
) -> Result<Json<Film>, ApiError> {
    let film = state
        .store
        .call(move |db| FilmRepository::new(db).get(film_id))
        .await?;
    Ok(Json(film))
}

/// Replace a film's fields.
#[utoipa::path(
    put,
    path = "/v1/films/{id}",
    tag = "Films",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Film ID")),
    request_body = FilmRequest,
    responses(
        (status = 200, description = "Updated film", body = Film),
        (status = 400, description = "Invalid film", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No update permission on this film", body = ErrorBody),
        (status = 404, description = "Film not found", body = ErrorBody)
    )
)]
pub async fn update_film(
    State(state): State<AppState>,
    AppPath(film_id): AppPath<Uuid>,
    AppJson(request): AppJson<FilmRequest>,
) -> Result<Json<Film>, ApiError> {
    let request = request.validated()?;
    let film = state
        .store
        .call(move |db| {
            let repo = FilmRepository::new(db);
            let mut film = repo.get(film_id)?;
            request.apply_to(&mut film);
            repo.update(&film)?;
            Ok(film)
        })
        .await?;
    Ok(Json(film))
}

/// Delete a film, its grants and its collection memberships.
#[utoipa::path(
    delete,
    path = "/v1/films/{id}",
    tag = "Films",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Film ID")),
    responses(
        (status = 204, description = "Film deleted"),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No delete permission on this film", body = ErrorBody),
        (status = 404, description = "Film not found", body = ErrorBody)
    )
)]
pub async fn delete_film(
    State(state): State<AppState>,
    AppPath(film_id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .call(move |db| FilmRepository::new(db).delete(film_id))
        .await?;

    tracing::info!(%film_id, "Film deleted");
    Ok(StatusCode::NO_CONTENT)
}
