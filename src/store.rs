use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::Error;

/// Thin wrapper around the connection pool. Every public entry point
/// (activity builders, inbox handlers, periodic jobs) opens one
/// transaction via [`Store::begin`] and commits or rolls back as a unit,
/// the same all-or-nothing discipline the teacher applies around
/// `&mut Transaction<'_, Postgres>`.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Store { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, Error> {
        self.pool.begin().await.map_err(Error::from)
    }
}
