// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `ToSchema` (or `IntoParams`) for OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Auth**: register, login, refresh and logout bodies
//! - **Users**: the caller's public identity
//! - **Films / Collections**: write bodies and paginated lists
//!
//! Stored `Film` and `Collection` rows are serialized as-is in responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{AccessGrant, AuthError, SessionTokens};
use crate::storage::{Collection, Film, Identity};

const TITLE_MAX: usize = 200;
const SHORT_TEXT_MAX: usize = 200;
const NOTES_MAX: usize = 2000;
const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 1000;
const RATING_MAX: u8 = 10;
const EARLIEST_RELEASE_YEAR: i32 = 1888;
const LATEST_RELEASE_YEAR: i32 = 2100;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

const TOKEN_TYPE: &str = "Bearer";

// =============================================================================
// Auth Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// 3-32 characters from `[A-Za-z0-9_.-]`.
    pub username: String,
    pub email: String,
    /// 8-128 characters.
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

/// Body of `/v1/auth/refresh` and `/v1/auth/logout`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl From<SessionTokens> for AuthResponse {
    fn from(session: SessionTokens) -> Self {
        Self {
            user: UserResponse::from(&session.identity),
            access_token: session.access.access_token,
            refresh_token: session.refresh_token.into_string(),
            token_type: TOKEN_TYPE.to_string(),
            expires_in: session.access.expires_in,
        }
    }
}

/// Returned by refresh.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl From<AccessGrant> for AccessTokenResponse {
    fn from(grant: AccessGrant) -> Self {
        Self {
            access_token: grant.access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: grant.expires_in,
        }
    }
}

// =============================================================================
// User Models
// =============================================================================

/// Public view of an identity. The password hash is never included.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            created_at: identity.created_at,
        }
    }
}

/// Partial update of the caller's identity.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Film Models
// =============================================================================

/// Body of film create (POST) and replace (PUT).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FilmRequest {
    pub title: String,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub watched: bool,
    /// 0-10.
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FilmRequest {
    /// Check field shapes and return a copy with trimmed text.
    pub fn validated(self) -> Result<Self, AuthError> {
        let title = required_text("title", &self.title, TITLE_MAX)?;
        let director = optional_text("director", self.director.as_deref(), SHORT_TEXT_MAX)?;
        let genre = optional_text("genre", self.genre.as_deref(), SHORT_TEXT_MAX)?;
        let notes = optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;

        if let Some(year) = self.release_year {
            if !(EARLIEST_RELEASE_YEAR..=LATEST_RELEASE_YEAR).contains(&year) {
                return Err(AuthError::InvalidInput(format!(
                    "release_year must be between {EARLIEST_RELEASE_YEAR} and {LATEST_RELEASE_YEAR}"
                )));
            }
        }
        if self.rating.is_some_and(|rating| rating > RATING_MAX) {
            return Err(AuthError::InvalidInput(format!(
                "rating must be between 0 and {RATING_MAX}"
            )));
        }

        Ok(Self {
            title,
            director,
            release_year: self.release_year,
            genre,
            watched: self.watched,
            rating: self.rating,
            notes,
        })
    }

    /// Build a new film owned by `created_by`.
    pub fn into_film(self, created_by: Uuid) -> Film {
        let now = Utc::now();
        Film {
            id: Uuid::new_v4(),
            title: self.title,
            director: self.director,
            release_year: self.release_year,
            genre: self.genre,
            watched: self.watched,
            rating: self.rating,
            notes: self.notes,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the mutable fields of an existing film.
    pub fn apply_to(self, film: &mut Film) {
        film.title = self.title;
        film.director = self.director;
        film.release_year = self.release_year;
        film.genre = self.genre;
        film.watched = self.watched;
        film.rating = self.rating;
        film.notes = self.notes;
        film.updated_at = Utc::now();
    }
}

/// One page of films.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FilmPage {
    pub items: Vec<Film>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

// =============================================================================
// Collection Models
// =============================================================================

/// Body of collection create (POST) and replace (PUT).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CollectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CollectionRequest {
    pub fn validated(self) -> Result<Self, AuthError> {
        Ok(Self {
            name: required_text("name", &self.name, NAME_MAX)?,
            description: optional_text(
                "description",
                self.description.as_deref(),
                DESCRIPTION_MAX,
            )?,
        })
    }

    pub fn into_collection(self, created_by: Uuid) -> Collection {
        let now = Utc::now();
        Collection {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            film_ids: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_to(self, collection: &mut Collection) {
        collection.name = self.name;
        collection.description = self.description;
        collection.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddFilmRequest {
    pub film_id: Uuid,
}

/// One page of collections.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionPage {
    pub items: Vec<Collection>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

// =============================================================================
// Pagination
// =============================================================================

/// Query parameters for list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    #[param(default = 1, minimum = 1)]
    pub page: Option<u32>,
    /// Page size (default: 20, capped at 100)
    #[param(default = 20, minimum = 1, maximum = 100)]
    pub per_page: Option<u32>,
}

/// A slice of a larger result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageQuery {
    /// Resolve defaults. Zero is rejected; oversized pages are capped.
    pub fn resolve(&self) -> Result<(u32, u32), AuthError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page == 0 || per_page == 0 {
            return Err(AuthError::InvalidInput(
                "page and per_page must be at least 1".to_string(),
            ));
        }
        Ok((page, per_page.min(MAX_PER_PAGE)))
    }

    /// Cut one page out of `items`.
    pub fn paginate<T>(&self, items: Vec<T>) -> Result<Paginated<T>, AuthError> {
        let (page, per_page) = self.resolve()?;
        let total = items.len() as u64;
        let total_pages = total.div_ceil(u64::from(per_page));
        let skip = (u64::from(page) - 1).saturating_mul(u64::from(per_page));

        let items = items
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(per_page as usize)
            .collect();

        Ok(Paginated {
            items,
            page,
            per_page,
            total,
            total_pages,
        })
    }
}

impl From<Paginated<Film>> for FilmPage {
    fn from(p: Paginated<Film>) -> Self {
        Self {
            items: p.items,
            page: p.page,
            per_page: p.per_page,
            total: p.total,
            total_pages: p.total_pages,
        }
    }
}

impl From<Paginated<Collection>> for CollectionPage {
    fn from(p: Paginated<Collection>) -> Self {
        Self {
            items: p.items,
            page: p.page,
            per_page: p.per_page,
            total: p.total,
            total_pages: p.total_pages,
        }
    }
}

// =============================================================================
// Validation helpers
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::InvalidInput(format!("{field} is required")));
    }
    check_length(field, value, max)?;
    Ok(value.to_string())
}

/// Blank optional text is stored as absent.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, AuthError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => {
            check_length(field, value, max)?;
            Ok(Some(value.to_string()))
        }
        None => Ok(None),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), AuthError> {
    if value.chars().count() > max {
        return Err(AuthError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
