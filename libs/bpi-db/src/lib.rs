pub mod models;
pub mod db;
pub mod repositories;

pub use sqlx;
use anyhow::{Context, Result};

pub async fn migrate(pool: &sqlx::PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run DB migrations")
}
