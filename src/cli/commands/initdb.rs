use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing::info;

pub async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database");

    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("failed to connect to database '{database_url}'"))?;

    Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;

    info!("Database initialization completed");
    Ok(())
}
