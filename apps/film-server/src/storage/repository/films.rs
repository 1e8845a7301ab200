// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Film repository.
//!
//! A film is created together with its permission grants in one write
//! transaction, and deleting it removes its grants and its collection
//! memberships in one write transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::database::{
    get_json, CredentialDb, StoreError, StoreResult, COLLECTIONS, FILMS,
};
use super::collections::Collection;
use super::permissions::{remove_resource_grants, write_code_if_absent, write_grants};
use crate::auth::permissions::PermissionGrant;

/// A tracked film.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Film {
    /// Unique film identifier.
    pub id: Uuid,
    /// Film title.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    /// Year of first release.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Whether the creator has watched it.
    pub watched: bool,
    /// Personal rating from 0 to 10.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Identity that created the film.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for film rows.
pub struct FilmRepository<'a> {
    db: &'a CredentialDb,
}

impl<'a> FilmRepository<'a> {
    pub fn new(db: &'a CredentialDb) -> Self {
        Self { db }
    }

    /// Insert a film and its grants atomically.
    ///
    /// Codes referenced by the grants are registered if absent.
    pub fn create_with_grants(&self, film: &Film, grants: &[PermissionGrant]) -> StoreResult<()> {
        let id = film.id.to_string();
        let json = serde_json::to_vec(film)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(FILMS)?;
            if table.get(id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Film {id}")));
            }
            table.insert(id.as_str(), json.as_slice())?;
        }
        for grant in grants {
            write_code_if_absent(&write_txn, grant.code)?;
        }
        write_grants(&write_txn, grants)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Get a film by id.
    pub fn get(&self, film_id: Uuid) -> StoreResult<Film> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(FILMS)?;
        get_json(&table, &film_id.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("Film {film_id}")))
    }

    /// Get the films that still exist among `film_ids`, in the given order.
    pub fn get_many(&self, film_ids: &[Uuid]) -> StoreResult<Vec<Film>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(FILMS)?;

        let mut films = Vec::with_capacity(film_ids.len());
        for film_id in film_ids {
            if let Some(film) = get_json(&table, &film_id.to_string())? {
                films.push(film);
            }
        }
        Ok(films)
    }

    /// Overwrite an existing film.
    pub fn update(&self, film: &Film) -> StoreResult<()> {
        let id = film.id.to_string();
        let json = serde_json::to_vec(film)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(FILMS)?;
            if table.get(id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Film {id}")));
            }
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a film, its grants, and its membership in every collection.
    pub fn delete(&self, film_id: Uuid) -> StoreResult<()> {
        let id = film_id.to_string();

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut films = write_txn.open_table(FILMS)?;
            if films.remove(id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Film {id}")));
            }

            let mut collections = write_txn.open_table(COLLECTIONS)?;
            let mut touched = Vec::new();
            for entry in collections.iter()? {
                let (_, value) = entry?;
                let mut collection: Collection = serde_json::from_slice(value.value())?;
                if collection.film_ids.contains(&film_id) {
                    collection.film_ids.retain(|f| *f != film_id);
                    collection.updated_at = Utc::now();
                    touched.push(collection);
                }
            }
            for collection in &touched {
                let json = serde_json::to_vec(collection)?;
                collections.insert(collection.id.to_string().as_str(), json.as_slice())?;
            }
        }
        remove_resource_grants(&write_txn, film_id)?;
        write_txn.commit()?;
        Ok(())
    }
}
