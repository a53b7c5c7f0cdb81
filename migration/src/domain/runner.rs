use std::collections::HashMap;

use chrono::{DateTime, Utc};
use vrl_common::{
    password::PasswordHashError,
    persistence::{DocumentStore, StoreError},
    validation::ValidationErrors,
};

use crate::domain::{changelog::Changelog, migration::Migration};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("migration {0} is recorded as applied but unknown to this build")]
    UnknownVersion(String),
    #[error("invalid account: {0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MigrationStatus {
    pub migration: Migration,
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Applies and reverts migrations, keeping the changelog in step.
pub struct Migrator<S, C> {
    store: S,
    changelog: C,
}

impl<S: DocumentStore, C: Changelog> Migrator<S, C> {
    pub fn new(store: S, changelog: C) -> Self {
        Self { store, changelog }
    }

    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied: HashMap<String, DateTime<Utc>> = self
            .changelog
            .applied()
            .await?
            .into_iter()
            .map(|entry| (entry.version, entry.applied_at))
            .collect();

        Ok(Migration::ALL
            .into_iter()
            .map(|migration| MigrationStatus {
                migration,
                applied_at: applied.get(migration.version()).copied(),
            })
            .collect())
    }

    /// Applies every pending migration in version order, returns the applied ones.
    pub async fn up(&self) -> Result<Vec<Migration>, MigrationError> {
        let mut applied = Vec::new();
        for status in self.status().await? {
            if status.is_applied() {
                continue;
            }
            let migration = status.migration;
            tracing::info!("applying {}: {}", migration, migration.description());
            migration.up(&self.store).await?;
            self.changelog.record(migration, Utc::now()).await?;
            applied.push(migration);
        }
        Ok(applied)
    }

    /// Reverts the most recently applied migration, if any.
    pub async fn down(&self) -> Result<Option<Migration>, MigrationError> {
        let Some(last) = self.changelog.applied().await?.pop() else {
            return Ok(None);
        };
        let migration =
            Migration::find(&last.version).ok_or(MigrationError::UnknownVersion(last.version))?;

        tracing::info!("reverting {}", migration);
        migration.down(&self.store).await?;
        self.changelog.remove(migration.version()).await?;
        Ok(Some(migration))
    }
}
