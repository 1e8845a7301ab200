// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collection endpoints.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::{
    auth::{Action, Auth, PermissionCode, PermissionGrant, ResourceType},
    error::{ApiError, ErrorBody},
    models::{AddFilmRequest, CollectionPage, CollectionRequest, PageQuery},
    state::AppState,
    storage::{Collection, CollectionRepository},
};

#[utoipa::path(
    post,
    path = "/v1/collections",
    tag = "Collections",
    security(("bearer" = [])),
    request_body = CollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = Collection),
        (status = 400, description = "Invalid collection", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn create_collection(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppJson(request): AppJson<CollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let collection = request.validated()?.into_collection(user.user_id);
    let grants =
        PermissionGrant::owner_triad(user.user_id, ResourceType::Collection, collection.id);

    let stored = collection.clone();
    state
        .store
        .call(move |db| CollectionRepository::new(db).create_with_grants(&stored, &grants))
        .await?;

    tracing::info!(collection_id = %collection.id, user_id = %user.user_id, "Collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

#[utoipa::path(
    get,
    path = "/v1/collections",
    tag = "Collections",
    security(("bearer" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of collections", body = CollectionPage),
        (status = 400, description = "Invalid pagination", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn list_collections(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<CollectionPage>, ApiError> {
    query.resolve()?;
    let ids = state
        .permissions
        .readable(user.user_id, ResourceType::Collection)
        .await?;

    let mut collections = state
        .store
        .call(move |db| CollectionRepository::new(db).get_many(&ids))
        .await?;
    collections.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    Ok(Json(query.paginate(collections)?.into()))
}

#[utoipa::path(
    get,
    path = "/v1/collections/{id}",
    tag = "Collections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection", body = Collection),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No read permission on this collection", body = ErrorBody),
        (status = 404, description = "Collection not found", body = ErrorBody)
    )
)]
pub async fn get_collection(
    State(state): State<AppState>,
    AppPath(collection_id): AppPath<Uuid>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state
        .store
        .call(move |db| CollectionRepository::new(db).get(collection_id))
        .await?;
    Ok(Json(collection))
}

/// Rename a collection or change its description. Membership is managed
/// through the `/films` sub-resource.
#[utoipa::path(
    put,
    path = "/v1/collections/{id}",
    tag = "Collections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = CollectionRequest,
    responses(
        (status = 200, description = "Updated collection", body = Collection),
        (status = 400, description = "Invalid collection", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No update permission on this collection", body = ErrorBody),
        (status = 404, description = "Collection not found", body = ErrorBody)
    )
)]
pub async fn update_collection(
    State(state): State<AppState>,
    AppPath(collection_id): AppPath<Uuid>,
    AppJson(request): AppJson<CollectionRequest>,
) -> Result<Json<Collection>, ApiError> {
    let request = request.validated()?;
    let collection = state
        .store
        .call(move |db| {
            let repo = CollectionRepository::new(db);
            let mut collection = repo.get(collection_id)?;
            request.apply_to(&mut collection);
            repo.update(&collection)?;
            Ok(collection)
        })
        .await?;
    Ok(Json(collection))
}

#[utoipa::path(
    delete,
    path = "/v1/collections/{id}",
    tag = "Collections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No delete permission on this collection", body = ErrorBody),
        (status = 404, description = "Collection not found", body = ErrorBody)
    )
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    AppPath(collection_id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .call(move |db| CollectionRepository::new(db).delete(collection_id))
        .await?;

    tracing::info!(%collection_id, "Collection deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Add a film to a collection. Requires update on the collection (checked
/// by the router) and read on the film.
#[utoipa::path(
    post,
    path = "/v1/collections/{id}/films",
    tag = "Collections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = AddFilmRequest,
    responses(
        (status = 200, description = "Updated collection", body = Collection),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No update permission on the collection or no read permission on the film", body = ErrorBody),
        (status = 404, description = "Collection or film not found", body = ErrorBody)
    )
)]
pub async fn add_film(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppPath(collection_id): AppPath<Uuid>,
    AppJson(request): AppJson<AddFilmRequest>,
) -> Result<Json<Collection>, ApiError> {
    let film_id = request.film_id;
    state
        .permissions
        .require(
            user.user_id,
            PermissionCode::new(ResourceType::Film, Action::Read),
            film_id,
        )
        .await?;

    let collection = state
        .store
        .call(move |db| CollectionRepository::new(db).add_film(collection_id, film_id))
        .await?;
    Ok(Json(collection))
}

/// Remove a film from a collection. The film itself is untouched.
#[utoipa::path(
    delete,
    path = "/v1/collections/{id}/films/{film_id}",
    tag = "Collections",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        ("film_id" = Uuid, Path, description = "Film ID")
    ),
    responses(
        (status = 200, description = "Updated collection", body = Collection),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No update permission on the collection", body = ErrorBody),
        (status = 404, description = "Collection not found or film not in it", body = ErrorBody)
    )
)]
pub async fn remove_film(
    State(state): State<AppState>,
    AppPath((collection_id, film_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state
        .store
        .call(move |db| CollectionRepository::new(db).remove_film(collection_id, film_id))
        .await?;
    Ok(Json(collection))
}
