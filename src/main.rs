use dotenvy::dotenv;
use listing_personalization::{
    config::{catalog, database},
    core::registry,
    errors::Result,
};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Connect and make sure the tables exist
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database tables ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed configs from the seller catalog, if there is one
    let catalog_path = catalog::default_catalog_path();
    if !Path::new(&catalog_path).exists() {
        warn!("No personalization catalog at {}; nothing to seed.", catalog_path);
        return Ok(());
    }

    let catalog = catalog::load_catalog(&catalog_path)
        .inspect_err(|e| error!("Failed to load catalog: {}", e))?;
    let seeded = registry::seed_catalog(&db, &catalog).await?;
    info!(
        listings = catalog.listings.len(),
        seeded, "Seeded personalization configs from {}", catalog_path
    );

    Ok(())
}
