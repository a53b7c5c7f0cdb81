use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;
use vrl_common::persistence::{
    DocumentStore, Filter, FindQuery, SortOrder, StoreError, decode, timestamp,
};

use crate::domain::{
    changelog::{AppliedMigration, Changelog},
    migration::Migration,
};

const VERSION_FIELD_NAME: &str = "version";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangelogEntry {
    version: String,
    applied_at: DateTime<Utc>,
}

/// Keeps the changelog as one document per applied migration.
#[derive(Clone)]
pub struct ChangelogAdapter<S> {
    store: S,
    collection: String,
}

impl<S: DocumentStore> ChangelogAdapter<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

impl<S: DocumentStore> Changelog for ChangelogAdapter<S> {
    async fn applied(&self) -> Result<Vec<AppliedMigration>, StoreError> {
        let query = FindQuery::new(Filter::new()).sort_by(VERSION_FIELD_NAME, SortOrder::Ascending);
        let documents = self.store.find(&self.collection, &query).await?;

        documents
            .into_iter()
            .map(|document| {
                decode::<ChangelogEntry>(document).map(|entry| AppliedMigration {
                    version: entry.version,
                    applied_at: entry.applied_at,
                })
            })
            .collect()
    }

    async fn record(&self, migration: Migration, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        let entry = doc! {
            "version": migration.version(),
            "name": migration.to_string(),
            "appliedAt": timestamp(applied_at),
        };
        self.store.insert_one(&self.collection, entry).await?;
        Ok(())
    }

    async fn remove(&self, version: &str) -> Result<(), StoreError> {
        let filter = Filter::new().equals(VERSION_FIELD_NAME, version);
        self.store.delete_one(&self.collection, &filter).await?;
        Ok(())
    }
}
