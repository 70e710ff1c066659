//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{PersonalizationConfig, ReusableSetup, Snapshot, Submission};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/personalization.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or
/// returns the default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the personalization tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(PersonalizationConfig),
        schema.create_table_from_entity(Submission),
        schema.create_table_from_entity(Snapshot),
        schema.create_table_from_entity(ReusableSetup),
    ];

    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    info!("Personalization tables ensured");
    Ok(())
}
