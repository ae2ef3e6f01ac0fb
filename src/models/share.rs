use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct Share {
    pub note: String,
    pub by: String,
    pub shared: i64,
}

pub async fn find(
    tx: &mut Transaction<'_, Sqlite>,
    note: &str,
    by: &str,
) -> Result<Option<Share>, Error> {
    let share = sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE note = ?1 AND by = ?2")
        .bind(note)
        .bind(by)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(share)
}

pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    note: &str,
    by: &str,
) -> Result<Share, Error> {
    let now = chrono::Utc::now().timestamp();
    let share = sqlx::query_as::<_, Share>(
        "INSERT INTO shares (note, by, shared) VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(note)
    .bind(by)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(share)
}

pub async fn delete(tx: &mut Transaction<'_, Sqlite>, note: &str, by: &str) -> Result<(), Error> {
    sqlx::query("DELETE FROM shares WHERE note = ?1 AND by = ?2")
        .bind(note)
        .bind(by)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
