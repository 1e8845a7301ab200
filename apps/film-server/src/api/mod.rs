// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        require_auth, require_permission, Action, PermissionCode, PermissionGate,
        PermissionRegistry, ResourceType,
    },
    error::{ApiError, ErrorBody},
    models::{
        AccessTokenResponse, AddFilmRequest, AuthResponse, CollectionPage, CollectionRequest,
        FilmPage, FilmRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
        UpdateUserRequest, UserResponse,
    },
    state::AppState,
    storage::{Collection, Film},
};

pub mod auth;
pub mod collections;
pub mod extract;
pub mod films;
pub mod health;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Attach a permission check for `(resource_type, action)` on `{id}`.
fn gated(
    route: MethodRouter<AppState>,
    permissions: &PermissionRegistry,
    resource_type: ResourceType,
    action: Action,
) -> MethodRouter<AppState> {
    let gate = PermissionGate::new(
        permissions.clone(),
        PermissionCode::new(resource_type, action),
    );
    route.route_layer(from_fn_with_state(gate, require_permission))
}

async fn fallback() -> ApiError {
    ApiError::not_found("No such route")
}

pub fn router(state: AppState) -> Router {
    use Action::{Delete, Read, Update};
    use ResourceType::{Collection as Coll, Film as F};

    let p = state.permissions.clone();

    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/refresh", post(auth::refresh))
        .route("/v1/auth/logout", post(auth::logout))
        .route(
            "/v1/users/me",
            get(users::get_current_user).patch(users::update_current_user),
        )
        .route(
            "/v1/films",
            get(films::list_films).post(films::create_film),
        )
        .route(
            "/v1/films/{id}",
            gated(get(films::get_film), &p, F, Read)
                .merge(gated(put(films::update_film), &p, F, Update))
                .merge(gated(delete(films::delete_film), &p, F, Delete)),
        )
        .route(
            "/v1/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/v1/collections/{id}",
            gated(get(collections::get_collection), &p, Coll, Read)
                .merge(gated(put(collections::update_collection), &p, Coll, Update))
                .merge(gated(delete(collections::delete_collection), &p, Coll, Delete)),
        )
        .route(
            "/v1/collections/{id}/films",
            gated(post(collections::add_film), &p, Coll, Update),
        )
        .route(
            "/v1/collections/{id}/films/{film_id}",
            gated(delete(collections::remove_film), &p, Coll, Update),
        )
        .fallback(fallback)
        .with_state(state.clone());

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state, require_auth))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        users::get_current_user,
        users::update_current_user,
        films::create_film,
        films::list_films,
        films::get_film,
        films::update_film,
        films::delete_film,
        collections::create_collection,
        collections::list_collections,
        collections::get_collection,
        collections::update_collection,
        collections::delete_collection,
        collections::add_film,
        collections::remove_film
    ),
    components(
        schemas(
            ErrorBody,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            AccessTokenResponse,
            UserResponse,
            UpdateUserRequest,
            Film,
            FilmRequest,
            FilmPage,
            Collection,
            CollectionRequest,
            CollectionPage,
            AddFilmRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login and token lifecycle"),
        (name = "Users", description = "The authenticated identity"),
        (name = "Films", description = "Film tracking"),
        (name = "Collections", description = "Named lists of films")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, Request, StatusCode,
        },
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let (state, dir) = AppState::for_tests();
            Self {
                app: router(state),
                _dir: dir,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(value) => {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }

        /// Register a user and return `(access_token, refresh_token)`.
        async fn register(&self, username: &str) -> (String, String) {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/v1/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{username}@example.com"),
                        "password": "correct horse battery",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            (
                body["access_token"].as_str().unwrap().to_string(),
                body["refresh_token"].as_str().unwrap().to_string(),
            )
        }

        async fn create_film(&self, token: &str, title: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/v1/films",
                    Some(token),
                    Some(json!({ "title": title, "release_year": 1966 })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["id"].as_str().unwrap().to_string()
        }

        async fn create_collection(&self, token: &str, name: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/v1/collections",
                    Some(token),
                    Some(json!({ "name": name })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["id"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_and_docs_are_public() {
        let app = TestApp::new();

        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["database"], "ok");

        let (status, _) = app.send(Method::GET, "/health/live", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, doc) = app
            .send(Method::GET, "/api-doc/openapi.json", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/v1/films/{id}"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = TestApp::new();

        let (status, body) = app.send(Method::GET, "/v1/films", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");

        let (status, _) = app
            .send(Method::GET, "/v1/users/me", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let app = TestApp::new();
        let (access, _) = app.register("alice").await;

        let (status, me) = app
            .send(Method::GET, "/v1/users/me", Some(&access), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
        assert!(me.get("password_hash").is_none());

        let (status, login) = app
            .send(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "identifier": "alice@example.com", "password": "correct horse battery" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["token_type"], "Bearer");
        assert!(!login["access_token"].as_str().unwrap().is_empty());
        assert!(!login["refresh_token"].as_str().unwrap().is_empty());

        let (status, updated) = app
            .send(
                Method::PATCH,
                "/v1/users/me",
                Some(&access),
                Some(json!({ "email": "alice@films.example" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["email"], "alice@films.example");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = TestApp::new();
        app.register("alice").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(json!({
                    "username": "alice",
                    "email": "someone@example.com",
                    "password": "correct horse battery",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "already_exists");
    }

    #[tokio::test]
    async fn bad_login_responses_are_identical() {
        let app = TestApp::new();
        app.register("alice").await;

        let wrong_password = app
            .send(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "identifier": "alice@example.com", "password": "wrong password" })),
            )
            .await;
        let unknown_email = app
            .send(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "identifier": "bob@example.com", "password": "correct horse battery" })),
            )
            .await;

        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password.1["error_code"], "invalid_credentials");
    }

    #[tokio::test]
    async fn refresh_and_logout_lifecycle() {
        let app = TestApp::new();
        let (_, refresh) = app.register("alice").await;
        let body = json!({ "refresh_token": refresh });

        let (status, first) = app
            .send(Method::POST, "/v1/auth/refresh", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = app
            .send(Method::POST, "/v1/auth/refresh", None, Some(body.clone()))
            .await;
        assert_ne!(first["access_token"], second["access_token"]);

        let new_access = second["access_token"].as_str().unwrap();
        let (status, _) = app
            .send(Method::GET, "/v1/users/me", Some(new_access), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .send(Method::POST, "/v1/auth/logout", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, err) = app
            .send(Method::POST, "/v1/auth/refresh", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn owner_can_manage_film() {
        let app = TestApp::new();
        let (token, _) = app.register("alice").await;
        let film_id = app.create_film(&token, "Persona").await;
        let uri = format!("/v1/films/{film_id}");

        let (status, film) = app.send(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(film["title"], "Persona");

        let (status, film) = app
            .send(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "title": "Persona", "watched": true, "rating": 10 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(film["watched"], true);
        assert_eq!(film["rating"], 10);

        let (status, page) = app.send(Method::GET, "/v1/films", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["id"], film_id.as_str());

        let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // grants went with the film
        let (status, _) = app.send(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (_, page) = app.send(Method::GET, "/v1/films", Some(&token), None).await;
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn other_user_is_forbidden_on_film() {
        let app = TestApp::new();
        let (alice, _) = app.register("alice").await;
        let (bob, _) = app.register("bob").await;
        let film_id = app.create_film(&alice, "Playtime").await;
        let uri = format!("/v1/films/{film_id}");

        let (status, body) = app.send(Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "forbidden");

        let (status, _) = app
            .send(Method::PUT, &uri, Some(&bob), Some(json!({ "title": "Mine now" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, page) = app.send(Method::GET, "/v1/films", Some(&bob), None).await;
        assert_eq!(page["total"], 0);

        let (status, _) = app.send(Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn other_user_is_forbidden_on_collection() {
        let app = TestApp::new();
        let (alice, _) = app.register("alice").await;
        let (bob, _) = app.register("bob").await;
        let film_id = app.create_film(&alice, "Sans Soleil").await;
        let collection_id = app.create_collection(&alice, "Marker").await;
        let uri = format!("/v1/collections/{collection_id}");
        let member_uri = format!("{uri}/films/{film_id}");

        let (status, _) = app
            .send(
                Method::POST,
                &format!("{uri}/films"),
                Some(&alice),
                Some(json!({ "film_id": film_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.send(Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "forbidden");

        let (status, _) = app
            .send(Method::PUT, &uri, Some(&bob), Some(json!({ "name": "Mine now" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(Method::DELETE, &member_uri, Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, page) = app
            .send(Method::GET, "/v1/collections", Some(&bob), None)
            .await;
        assert_eq!(page["total"], 0);

        // nothing bob attempted took effect
        let (status, collection) = app.send(Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collection["name"], "Marker");
        assert_eq!(collection["film_ids"][0], film_id.as_str());
    }

    #[tokio::test]
    async fn malformed_input_is_bad_request() {
        let app = TestApp::new();
        let (token, _) = app.register("alice").await;

        let (status, body) = app
            .send(Method::GET, "/v1/films/not-a-uuid", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");

        let (status, _) = app
            .send(Method::POST, "/v1/films", Some(&token), Some(json!({ "title": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(Method::GET, "/v1/films?page=0", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn collections_track_films_and_check_film_access() {
        let app = TestApp::new();
        let (alice, _) = app.register("alice").await;
        let (bob, _) = app.register("bob").await;

        let film_id = app.create_film(&alice, "Jeanne Dielman").await;
        let collection_id = app.create_collection(&alice, "Chantal Akerman").await;
        let films_uri = format!("/v1/collections/{collection_id}/films");

        let (status, collection) = app
            .send(
                Method::POST,
                &films_uri,
                Some(&alice),
                Some(json!({ "film_id": film_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collection["film_ids"][0], film_id.as_str());

        // bob cannot touch alice's collection or add alice's film to his own
        let (status, _) = app
            .send(
                Method::POST,
                &films_uri,
                Some(&bob),
                Some(json!({ "film_id": film_id })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let bobs = app.create_collection(&bob, "Borrowed").await;
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/v1/collections/{bobs}/films"),
                Some(&bob),
                Some(json!({ "film_id": film_id })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // deleting the film drops it from the collection
        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/v1/films/{film_id}"),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, collection) = app
            .send(
                Method::GET,
                &format!("/v1/collections/{collection_id}"),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(collection["film_ids"], json!([]));

        let (status, page) = app
            .send(Method::GET, "/v1/collections", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
    }

    #[tokio::test]
    async fn removing_a_film_from_a_collection() {
        let app = TestApp::new();
        let (token, _) = app.register("alice").await;
        let film_id = app.create_film(&token, "Wanda").await;
        let collection_id = app.create_collection(&token, "Loden").await;

        app.send(
            Method::POST,
            &format!("/v1/collections/{collection_id}/films"),
            Some(&token),
            Some(json!({ "film_id": film_id })),
        )
        .await;

        let member_uri = format!("/v1/collections/{collection_id}/films/{film_id}");
        let (status, collection) = app
            .send(Method::DELETE, &member_uri, Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collection["film_ids"], json!([]));

        let (status, _) = app
            .send(Method::DELETE, &member_uri, Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Method::GET,
                &format!("/v1/films/{film_id}"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let app = TestApp::new();
        let response = app
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
