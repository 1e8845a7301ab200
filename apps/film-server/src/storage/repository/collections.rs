// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collection repository.
//!
//! Collections are ordered lists of film ids. Like films, they are created
//! together with their grants and their grants go away with them.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::database::{
    get_json, CredentialDb, StoreError, StoreResult, COLLECTIONS, FILMS,
};
use super::permissions::{remove_resource_grants, write_code_if_absent, write_grants};
use crate::auth::permissions::PermissionGrant;

/// A named, ordered list of films.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Collection {
    /// Unique collection identifier.
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member films, in insertion order.
    pub film_ids: Vec<Uuid>,
    /// Identity that created the collection.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for collection rows.
pub struct CollectionRepository<'a> {
    db: &'a CredentialDb,
}

impl<'a> CollectionRepository<'a> {
    pub fn new(db: &'a CredentialDb) -> Self {
        Self { db }
    }

    /// Insert a collection and its grants atomically.
    pub fn create_with_grants(
        &self,
        collection: &Collection,
        grants: &[PermissionGrant],
    ) -> StoreResult<()> {
        let id = collection.id.to_string();
        let json = serde_json::to_vec(collection)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(COLLECTIONS)?;
            if table.get(id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Collection {id}")));
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

    /// Get a collection by id.
    pub fn get(&self, collection_id: Uuid) -> StoreResult<Collection> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(COLLECTIONS)?;
        get_json(&table, &collection_id.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("Collection {collection_id}")))
    }

    /// Get the collections that still exist among `collection_ids`.
    pub fn get_many(&self, collection_ids: &[Uuid]) -> StoreResult<Vec<Collection>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(COLLECTIONS)?;

        let mut collections = Vec::with_capacity(collection_ids.len());
        for collection_id in collection_ids {
            if let Some(collection) = get_json(&table, &collection_id.to_string())? {
                collections.push(collection);
            }
        }
        Ok(collections)
    }

    /// Overwrite an existing collection.
    pub fn update(&self, collection: &Collection) -> StoreResult<()> {
        let id = collection.id.to_string();
        let json = serde_json::to_vec(collection)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(COLLECTIONS)?;
            if table.get(id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Collection {id}")));
            }
            table.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a collection and its grants. Member films are untouched.
    pub fn delete(&self, collection_id: Uuid) -> StoreResult<()> {
        let id = collection_id.to_string();

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(COLLECTIONS)?;
            if table.remove(id.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Collection {id}")));
            }
        }
        remove_resource_grants(&write_txn, collection_id)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Append a film to a collection. Adding a member again is a no-op.
    pub fn add_film(&self, collection_id: Uuid, film_id: Uuid) -> StoreResult<Collection> {
        let id = collection_id.to_string();

        let write_txn = self.db.inner().begin_write()?;
        let collection = {
            let films = write_txn.open_table(FILMS)?;
            if films.get(film_id.to_string().as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Film {film_id}")));
            }

            let mut table = write_txn.open_table(COLLECTIONS)?;
            let mut collection: Collection = get_json(&table, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("Collection {id}")))?;

            if !collection.film_ids.contains(&film_id) {
                collection.film_ids.push(film_id);
                collection.updated_at = Utc::now();
                let json = serde_json::to_vec(&collection)?;
                table.insert(id.as_str(), json.as_slice())?;
            }
            collection
        };
        write_txn.commit()?;
        Ok(collection)
    }

    /// Remove a film from a collection.
    ///
    /// # Errors
    /// `StoreError::NotFound` if the collection does not exist or the film is
    /// not a member.
    pub fn remove_film(&self, collection_id: Uuid, film_id: Uuid) -> StoreResult<Collection> {
        let id = collection_id.to_string();

        let write_txn = self.db.inner().begin_write()?;
        let collection = {
            let mut table = write_txn.open_table(COLLECTIONS)?;
            let mut collection: Collection = get_json(&table, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("Collection {id}")))?;

            if !collection.film_ids.contains(&film_id) {
                return Err(StoreError::NotFound(format!(
                    "Film {film_id} in collection {id}"
                )));
            }
            collection.film_ids.retain(|f| *f != film_id);
            collection.updated_at = Utc::now();
            let json = serde_json::to_vec(&collection)?;
            table.insert(id.as_str(), json.as_slice())?;
            collection
        };
        write_txn.commit()?;
        Ok(collection)
    }
}
