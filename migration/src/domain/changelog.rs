use chrono::{DateTime, Utc};
use vrl_common::persistence::StoreError;

use crate::domain::migration::Migration;

/// A migration recorded as applied.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedMigration {
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

/// Record of the migrations applied to a store.
pub trait Changelog: Send + Sync {
    /// applied migrations in version order
    fn applied(&self) -> impl Future<Output = Result<Vec<AppliedMigration>, StoreError>> + Send;

    fn record(
        &self,
        migration: Migration,
        applied_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove(&self, version: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
