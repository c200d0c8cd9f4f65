//! Datamart DB - persistence gateway
//!
//! [`DatasetStore`] and [`BlogStore`] are the seams; [`DatasetRepository`]
//! and [`BlogRepository`] implement them on PostgreSQL, [`MemoryStore`] in
//! process.

pub mod blog;
pub mod memory;
pub mod repository;
pub mod store;

pub use blog::BlogRepository;
pub use memory::MemoryStore;
pub use repository::DatasetRepository;
pub use sqlx::PgPool;
pub use store::{BlogStore, DatasetStore};

use datamart_core::config::DbConfig;
use datamart_core::error::AppError;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Opens a pool and applies pending migrations.
pub async fn connect(database_url: &str, config: &DbConfig) -> Result<PgPool, AppError> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .map_err(AppError::DatabaseError)?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Generic(format!("Migration failed: {}", e)))?;

    Ok(pool)
}
