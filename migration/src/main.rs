use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vrl_common::{MongoStore, database};

use crate::{
    domain::{
        admin::{AdminAccount, create_admin},
        runner::Migrator,
    },
    infrastructure::{changelog::ChangelogAdapter, settings::Settings},
};

pub mod domain;
pub mod infrastructure;

#[derive(Parser)]
#[command(about = "Apply, revert and inspect database migrations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// apply every pending migration
    Up,
    /// revert the last applied migration
    Down,
    /// list migrations with their state
    Status,
    /// create an administrator account, or promote an existing one
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    tracing::debug!("Configuration loaded");

    let database = database::connect(&settings.database).await?;
    let store = MongoStore::new(database);
    let migrator = Migrator::new(
        store,
        ChangelogAdapter::new(store, settings.changelog_collection.clone()),
    );

    match cli.command {
        Command::Up => {
            let applied = migrator.up().await?;
            if applied.is_empty() {
                tracing::info!("Database is up to date");
            }
        }
        Command::Down => match migrator.down().await? {
            Some(migration) => tracing::info!("Reverted {}", migration),
            None => tracing::info!("No applied migrations"),
        },
        Command::Status => {
            for status in migrator.status().await? {
                match status.applied_at {
                    Some(applied_at) => {
                        tracing::info!("{} applied at {}", status.migration, applied_at.to_rfc3339())
                    }
                    None => tracing::info!("{} pending", status.migration),
                }
            }
        }
        Command::CreateAdmin {
            name,
            email,
            password,
        } => match create_admin(&store, name, email, password).await? {
            AdminAccount::Created(id) => tracing::info!("Admin account {} created", id),
            AdminAccount::Promoted => tracing::info!("Existing account promoted to admin"),
        },
    }

    Ok(())
}
