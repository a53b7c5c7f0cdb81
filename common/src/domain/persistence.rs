use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::domain::DocumentId;
use crate::ID_FIELD_NAME;

/// Name the store gives the implicit primary key index.
pub const ID_INDEX_NAME: &str = "_id_";

/// Collection oriented access to the persistent store.
///
/// Every write path of the application goes through this trait, which keeps
/// the MongoDB driver out of the domain and lets tests run against
/// `test_utils::InMemoryStore`.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// names of all existing collections
    fn collection_names(&self) -> impl Future<Output = Result<HashSet<String>, StoreError>> + Send;

    fn create_collection(&self, name: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// drop a collection, dropping a missing collection is not an error
    fn drop_collection(&self, name: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// names of all indexes of a collection, empty when the collection is missing
    fn index_names(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<HashSet<String>, StoreError>> + Send;

    fn create_index(
        &self,
        collection: &str,
        index: &IndexDefinition,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn drop_index(
        &self,
        collection: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    fn count(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// insert a document, generating `_id` when it is absent
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = Result<ObjectId, StoreError>> + Send;

    /// update the first matching document and return it as it is after the update
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// update all matching documents, returns the number of modified documents
    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// delete the first matching document, returns whether one was deleted
    fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to connect to the store: {0}")]
    Connection(String),
    #[error("store operation failed: {0}")]
    Execution(String),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error("failed to decode document: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equals { field: String, value: Bson },
    Exists { field: String, exists: bool },
}

/// Conjunction of simple conditions on top level fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &DocumentId) -> Self {
        // a malformed id cannot get here, the fallback only matches nothing
        let value = ObjectId::parse_str(id.as_ref())
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| Bson::String(id.to_string()));
        Self::new().equals(ID_FIELD_NAME, value)
    }

    pub fn by_object_id(id: ObjectId) -> Self {
        Self::new().equals(ID_FIELD_NAME, id)
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn exists(mut self, field: impl Into<String>, exists: bool) -> Self {
        self.conditions.push(Condition::Exists {
            field: field.into(),
            exists,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for condition in self.conditions.iter() {
            match condition {
                Condition::Equals { field, value } => {
                    document.insert(field.clone(), value.clone());
                }
                Condition::Exists { field, exists } => {
                    document.insert(field.clone(), doc! { "$exists": *exists });
                }
            }
        }
        document
    }
}

/// `$set` / `$unset` modifications of top level fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    set: Document,
    unset: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_all(mut self, fields: Document) -> Self {
        for (field, value) in fields {
            self.set.insert(field, value);
        }
        self
    }

    /// Applies an encoded patch: `null` values remove the field, everything else is set.
    pub fn patch(mut self, fields: Document) -> Self {
        for (field, value) in fields {
            match value {
                Bson::Null => self.unset.push(field),
                value => {
                    self.set.insert(field, value);
                }
            }
        }
        self
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    pub fn set_fields(&self) -> &Document {
        &self.set
    }

    pub fn unset_fields(&self) -> &[String] {
        &self.unset
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        if !self.set.is_empty() {
            document.insert("$set", self.set.clone());
        }
        if !self.unset.is_empty() {
            let unset: Document = self
                .unset
                .iter()
                .map(|field| (field.clone(), Bson::String(String::new())))
                .collect();
            document.insert("$unset", unset);
        }
        document
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<i64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn page(mut self, skip: u64, limit: i64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    pub fn sort_document(&self) -> Document {
        self.sort
            .iter()
            .map(|(field, order)| (field.clone(), Bson::Int32(order.as_i32())))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDefinition {
    pub keys: Vec<(String, SortOrder)>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Ascending)],
            unique: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortOrder::Descending)],
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Same naming rule the store applies to unnamed indexes: `title_1`, `createdAt_-1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, order)| format!("{}_{}", field, order.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn keys_document(&self) -> Document {
        self.keys
            .iter()
            .map(|(field, order)| (field.clone(), Bson::Int32(order.as_i32())))
            .collect()
    }
}

/// Identifier of a freshly inserted document.
pub fn document_id(id: ObjectId) -> Result<DocumentId, StoreError> {
    DocumentId::parse(id.to_hex()).map_err(StoreError::Decode)
}

/// Store representation of a point in time, millisecond precision.
pub fn timestamp(at: DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(at.timestamp_millis()))
}

/// Serializes a value into a document ready to be written.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    bson::to_document(value).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Reads a stored document into its API shape: ObjectIds become hex
/// strings and dates become RFC 3339 strings.
pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    let json = flatten_extended_json(Bson::Document(document).into_relaxed_extjson());
    serde_json::from_value(json).map_err(|e| StoreError::Decode(e.to_string()))
}

fn flatten_extended_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                for key in ["$oid", "$date"] {
                    if let Some(Value::String(inner)) = map.get(key) {
                        return Value::String(inner.clone());
                    }
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, flatten_extended_json(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_extended_json).collect()),
        other => other,
    }
}
