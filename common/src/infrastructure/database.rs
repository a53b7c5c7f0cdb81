use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, anyhow};
use mongodb::{Client, bson::doc, options::ClientOptions};
use serde::Deserialize;

#[derive(Clone, Debug)]
pub struct Database {
    database: mongodb::Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub uri: String,
    pub db: String,
    pub connection: DatabaseConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConnection {
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub connect_timeout_seconds: u64,
}

static DATABASE: OnceLock<Arc<Database>> = OnceLock::new();

pub async fn connect(settings: &DatabaseSettings) -> Result<&'static Database, anyhow::Error> {
    let database = Database::new(settings).await?;
    DATABASE
        .set(Arc::new(database))
        .map_err(|_| anyhow!("database connection is already initialized"))?;
    DATABASE
        .get()
        .map(Arc::as_ref)
        .ok_or_else(|| anyhow!("database connection is not initialized"))
}

impl Database {
    async fn new(settings: &DatabaseSettings) -> Result<Self, anyhow::Error> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .with_context(|| format!("invalid database uri for {}", settings.db))?;

        let connection = &settings.connection;
        options.min_pool_size = Some(connection.min_pool_size);
        options.max_pool_size = Some(connection.max_pool_size);
        options.connect_timeout = Some(Duration::from_secs(connection.connect_timeout_seconds));
        options.server_selection_timeout =
            Some(Duration::from_secs(connection.connect_timeout_seconds));

        let client = Client::with_options(options)
            .with_context(|| format!("failed to create database client for {}", settings.db))?;
        let database = client.database(&settings.db);

        // the driver connects lazily, ping to fail at startup instead of on the first request
        database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("failed to open database {}", settings.db))?;

        tracing::info!("connected to database {}", settings.db);

        Ok(Self { database })
    }

    pub fn database(&self) -> &mongodb::Database {
        &self.database
    }
}
