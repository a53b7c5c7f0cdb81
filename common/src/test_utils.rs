use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use mongodb::bson::{Bson, Document, oid::ObjectId};

use crate::ID_FIELD_NAME;
use crate::domain::persistence::{
    Condition, DocumentStore, Filter, FindQuery, ID_INDEX_NAME, IndexDefinition, SortOrder,
    StoreError, Update,
};

/// In process `DocumentStore` with the subset of MongoDB semantics the
/// application relies on: implicit collection creation, `_id_` index,
/// unique single field indexes and `$set` / `$unset` updates.
///
/// Public so that other crates can reuse it for their own tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    collections: Arc<Mutex<HashMap<String, MemoryCollection>>>,
}

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<IndexDefinition>,
}

impl MemoryCollection {
    fn unique_violation(&self, candidate: &Document, skip: Option<usize>) -> Option<String> {
        for index in self.indexes.iter().filter(|index| index.unique) {
            let [(field, _)] = index.keys.as_slice() else {
                continue;
            };
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let taken = self
                .documents
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(field) == Some(value));
            if taken {
                return Some(format!("{} dup key: {{ {}: {} }}", index.name(), field, value));
            }
        }
        None
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document directly, bypassing index checks.
    pub fn seed(&self, collection: &str, mut document: Document) -> ObjectId {
        let id = document
            .get_object_id(ID_FIELD_NAME)
            .unwrap_or_else(|_| ObjectId::new());
        document.insert(ID_FIELD_NAME, id);
        self.lock()
            .entry(collection.to_owned())
            .or_default()
            .documents
            .push(document);
        id
    }

    /// Snapshot of all documents of a collection in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemoryCollection>> {
        // a test that panicked while holding the lock has already failed
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn matches_filter(document: &Document, filter: &Filter) -> bool {
    filter.conditions().iter().all(|condition| match condition {
        Condition::Equals { field, value } => document.get(field) == Some(value),
        Condition::Exists { field, exists } => document.contains_key(field) == *exists,
    })
}

fn apply(document: &mut Document, update: &Update) {
    for (field, value) in update.set_fields() {
        document.insert(field.clone(), value.clone());
    }
    for field in update.unset_fields() {
        document.remove(field);
    }
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(Bson::Int32(a)), Some(Bson::Int32(b))) => a.cmp(b),
        (Some(Bson::Int64(a)), Some(Bson::Int64(b))) => a.cmp(b),
        (Some(Bson::Double(a)), Some(Bson::Double(b))) => a.total_cmp(b),
        (Some(Bson::DateTime(a)), Some(Bson::DateTime(b))) => a.cmp(b),
        (Some(Bson::ObjectId(a)), Some(Bson::ObjectId(b))) => a.cmp(b),
        (Some(Bson::Boolean(a)), Some(Bson::Boolean(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl DocumentStore for InMemoryStore {
    async fn collection_names(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self.lock();
        if collections.contains_key(name) {
            return Err(StoreError::Execution(format!(
                "collection {name} already exists"
            )));
        }
        collections.insert(name.to_owned(), MemoryCollection::default());
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        self.lock().remove(name);
        Ok(())
    }

    async fn index_names(&self, collection: &str) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .map(|c| {
                std::iter::once(ID_INDEX_NAME.to_owned())
                    .chain(c.indexes.iter().map(IndexDefinition::name))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_index(
        &self,
        collection: &str,
        index: &IndexDefinition,
    ) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let target = collections.entry(collection.to_owned()).or_default();
        if !target.indexes.iter().any(|i| i.name() == index.name()) {
            target.indexes.push(index.clone());
        }
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), StoreError> {
        if let Some(target) = self.lock().get_mut(collection) {
            target.indexes.retain(|index| index.name() != name);
        }
        Ok(())
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock();
        let Some(source) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<Document> = source
            .documents
            .iter()
            .filter(|document| matches_filter(document, &query.filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            query
                .sort
                .iter()
                .map(|(field, order)| {
                    let ordering = compare(a.get(field), b.get(field));
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let skipped = found.into_iter().skip(query.skip as usize);
        Ok(match query.limit {
            Some(limit) if limit > 0 => skipped.take(limit as usize).collect(),
            _ => skipped.collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .map(|c| c.documents.iter().filter(|d| matches_filter(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|c| c.documents.iter().find(|d| matches_filter(d, filter)).cloned()))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<ObjectId, StoreError> {
        let id = document
            .get_object_id(ID_FIELD_NAME)
            .unwrap_or_else(|_| ObjectId::new());
        document.insert(ID_FIELD_NAME, id);

        let mut collections = self.lock();
        let target = collections.entry(collection.to_owned()).or_default();
        if target
            .documents
            .iter()
            .any(|d| d.get_object_id(ID_FIELD_NAME).ok() == Some(id))
        {
            return Err(StoreError::DuplicateKey(format!("{ID_INDEX_NAME} dup key: {id}")));
        }
        if let Some(violation) = target.unique_violation(&document, None) {
            return Err(StoreError::DuplicateKey(violation));
        }
        target.documents.push(document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.lock();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = target.documents.iter().position(|d| matches_filter(d, filter)) else {
            return Ok(None);
        };

        let mut updated = target.documents[position].clone();
        apply(&mut updated, update);
        if let Some(violation) = target.unique_violation(&updated, Some(position)) {
            return Err(StoreError::DuplicateKey(violation));
        }
        target.documents[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let mut collections = self.lock();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut modified = 0;
        for document in target.documents.iter_mut().filter(|d| matches_filter(d, filter)) {
            let before = document.clone();
            apply(document, update);
            if *document != before {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, StoreError> {
        let mut collections = self.lock();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match target.documents.iter().position(|d| matches_filter(d, filter)) {
            Some(position) => {
                target.documents.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
