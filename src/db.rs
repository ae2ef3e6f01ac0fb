use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::Error;

/// Opens the store file, applying pragmas the way a single-writer
/// federation server needs: WAL for concurrent readers during a writer's
/// transaction, foreign keys on since the schema leans on them.
pub async fn connect_database(config: &Config) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(&format!(
        "sqlite://{}",
        config.db_path.display()
    ))
    .map_err(|e| Error::Fatal(format!("invalid database path: {e}")))?
    .create_if_missing(true)
    .journal_mode(SqliteJournalMode::Wal)
    .foreign_keys(true)
    .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.resolver_max_idle_conns.max(1))
        .idle_timeout(Some(config.resolver_idle_conn_timeout))
        .connect_with(options)
        .await
        .map_err(|e| Error::Fatal(format!("failed to open database: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| Error::Fatal(format!("migration failed: {e}")))?;

    Ok(pool)
}
