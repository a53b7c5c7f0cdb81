use std::collections::HashSet;

use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Document, oid::ObjectId},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    IndexModel,
};

use crate::ID_FIELD_NAME;
use crate::domain::persistence::{
    DocumentStore, Filter, FindQuery, IndexDefinition, StoreError, Update,
};
use crate::infrastructure::database::Database;

const DUPLICATE_KEY_CODE: i32 = 11000;
const NAMESPACE_NOT_FOUND_CODE: i32 = 26;
const INDEX_NOT_FOUND_CODE: i32 = 27;

/// `DocumentStore` backed by the MongoDB driver.
#[derive(Clone, Copy, Debug)]
pub struct MongoStore {
    database: &'static Database,
}

impl MongoStore {
    pub fn new(database: &'static Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.database().collection::<Document>(name)
    }
}

fn error_code(error: &MongoError) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

fn store_error(error: MongoError) -> StoreError {
    if error_code(&error) == Some(DUPLICATE_KEY_CODE) {
        return StoreError::DuplicateKey(error.to_string());
    }
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
            StoreError::Connection(error.to_string())
        }
        _ => StoreError::Execution(error.to_string()),
    }
}

impl DocumentStore for MongoStore {
    async fn collection_names(&self) -> Result<HashSet<String>, StoreError> {
        let names = self
            .database
            .database()
            .list_collection_names()
            .await
            .map_err(store_error)?;
        Ok(names.into_iter().collect())
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        self.database
            .database()
            .create_collection(name)
            .await
            .map_err(store_error)
    }

    async fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        match self.collection(name).drop().await {
            Err(e) if error_code(&e) != Some(NAMESPACE_NOT_FOUND_CODE) => Err(store_error(e)),
            _ => Ok(()),
        }
    }

    async fn index_names(&self, collection: &str) -> Result<HashSet<String>, StoreError> {
        match self.collection(collection).list_index_names().await {
            Ok(names) => Ok(names.into_iter().collect()),
            Err(e) if error_code(&e) == Some(NAMESPACE_NOT_FOUND_CODE) => Ok(HashSet::new()),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn create_index(
        &self,
        collection: &str,
        index: &IndexDefinition,
    ) -> Result<(), StoreError> {
        let options = IndexOptions::builder()
            .name(index.name())
            .unique(index.unique)
            .build();
        let model = IndexModel::builder()
            .keys(index.keys_document())
            .options(options)
            .build();

        self.collection(collection)
            .create_index(model)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), StoreError> {
        match self.collection(collection).drop_index(name).await {
            Err(e)
                if !matches!(
                    error_code(&e),
                    Some(NAMESPACE_NOT_FOUND_CODE) | Some(INDEX_NOT_FOUND_CODE)
                ) =>
            {
                Err(store_error(e))
            }
            _ => Ok(()),
        }
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let collection = self.collection(collection);
        let mut action = collection
            .find(query.filter.to_document())
            .sort(query.sort_document())
            .skip(query.skip);
        if let Some(limit) = query.limit {
            action = action.limit(limit);
        }

        let cursor = action.await.map_err(store_error)?;
        cursor.try_collect().await.map_err(store_error)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(filter.to_document())
            .await
            .map_err(store_error)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(filter.to_document())
            .await
            .map_err(store_error)
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<ObjectId, StoreError> {
        let id = match document.get_object_id(ID_FIELD_NAME) {
            Ok(id) => id,
            Err(_) => {
                let id = ObjectId::new();
                document.insert(ID_FIELD_NAME, id);
                id
            }
        };

        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(store_error)?;
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one_and_update(filter.to_document(), update.to_document())
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        self.collection(collection)
            .update_many(filter.to_document(), update.to_document())
            .await
            .map(|result| result.modified_count)
            .map_err(store_error)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, StoreError> {
        self.collection(collection)
            .delete_one(filter.to_document())
            .await
            .map(|result| result.deleted_count > 0)
            .map_err(store_error)
    }
}
