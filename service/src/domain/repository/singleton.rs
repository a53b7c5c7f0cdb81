use std::marker::PhantomData;

use chrono::Utc;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use vrl_common::{
    CREATED_FIELD_NAME, ID_FIELD_NAME, UPDATED_FIELD_NAME, VERSION_FIELD_NAME,
    entities::Singleton,
    persistence::{DocumentStore, Filter, StoreError, Update, decode, encode, timestamp},
};

use crate::domain::repository::{RepositoryError, empty_update};

/// Access to a collection holding one live document, e.g. the home page copy.
///
/// Writes carry an optimistic version: the stored `version` goes up by one on
/// every update, and an update sent with a stale `version` is refused.
pub struct SingletonRepository<'a, S, T> {
    store: &'a S,
    singleton: PhantomData<T>,
}

/// Id of the document created by a first write. Racing first writes collide on
/// it, so at most one of them inserts.
pub const SINGLETON_ID: ObjectId = ObjectId::from_bytes([0; 12]);

fn stored_version(document: &Document) -> Option<i64> {
    match document.get(VERSION_FIELD_NAME) {
        Some(Bson::Int64(version)) => Some(*version),
        Some(Bson::Int32(version)) => Some(i64::from(*version)),
        _ => None,
    }
}

fn stale(name: &str, expected: i64, actual: i64) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "{name} was modified concurrently, expected version {expected} but found {actual}"
    ))
}

impl<'a, S: DocumentStore, T: Singleton> SingletonRepository<'a, S, T> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            singleton: PhantomData,
        }
    }

    /// The live document, or the defaults when none was written yet.
    pub async fn get(&self) -> Result<T, RepositoryError> {
        match self.store.find_one(T::COLLECTION, &Filter::new()).await? {
            Some(document) => Ok(decode(document)?),
            None => Ok(T::default()),
        }
    }

    /// Merges the supplied fields, creating the document on first write.
    pub async fn update(&self, input: T::Input) -> Result<T, RepositoryError> {
        let patch = T::validate_patch(input)?;
        let fields = encode(&patch.fields)?;
        if fields.is_empty() {
            return Err(empty_update());
        }
        let now = timestamp(Utc::now());

        let current = match self.store.find_one(T::COLLECTION, &Filter::new()).await? {
            Some(document) => document,
            None => {
                if let Some(expected) = patch.expected_version.filter(|v| *v != 0) {
                    return Err(stale(T::NAME, expected, 0));
                }
                if let Some(created) = self.insert_first(fields.clone(), now.clone()).await? {
                    return Ok(decode(created)?);
                }
                // a concurrent first write won, merge into its document
                self.store
                    .find_one(T::COLLECTION, &Filter::by_object_id(SINGLETON_ID))
                    .await?
                    .ok_or(RepositoryError::NotFound(T::NAME))?
            }
        };

        let version = stored_version(&current);
        let actual = version.unwrap_or(0);
        if let Some(expected) = patch.expected_version.filter(|v| *v != actual) {
            return Err(stale(T::NAME, expected, actual));
        }

        let id = current
            .get_object_id(ID_FIELD_NAME)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        // the version in the filter makes the write lose against a concurrent one
        let filter = match version {
            Some(version) => Filter::by_object_id(id).equals(VERSION_FIELD_NAME, version),
            None => Filter::by_object_id(id).exists(VERSION_FIELD_NAME, false),
        };
        let update = Update::new()
            .set_all(fields)
            .set(VERSION_FIELD_NAME, actual + 1)
            .set(UPDATED_FIELD_NAME, now);

        match self.store.update_one(T::COLLECTION, &filter, &update).await? {
            Some(document) => Ok(decode(document)?),
            None => Err(RepositoryError::Conflict(format!(
                "{} was modified concurrently, reload and retry",
                T::NAME
            ))),
        }
    }

    /// `None` when another first write already created the document.
    async fn insert_first(
        &self,
        fields: Document,
        now: Bson,
    ) -> Result<Option<Document>, RepositoryError> {
        let mut document = encode(&T::default())?;
        document.insert(ID_FIELD_NAME, SINGLETON_ID);
        for (field, value) in fields {
            document.insert(field, value);
        }
        document.insert(VERSION_FIELD_NAME, 1_i64);
        document.insert(CREATED_FIELD_NAME, now.clone());
        document.insert(UPDATED_FIELD_NAME, now);

        match self.store.insert_one(T::COLLECTION, document).await {
            Ok(id) => {
                tracing::info!("created {} {}", T::NAME, id);
                let created = self
                    .store
                    .find_one(T::COLLECTION, &Filter::by_object_id(id))
                    .await?
                    .ok_or(RepositoryError::NotFound(T::NAME))?;
                Ok(Some(created))
            }
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!("{} was created concurrently", T::NAME);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
