//! SQLite connection pool.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DbConfig;

/// Opens the pool, creating the database file (and its parent directory)
/// on first use. WAL mode keeps reads cheap while uploads write.
pub async fn connect(config: &DbConfig) -> Result<SqlitePool> {
    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
