use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct FeedEntry {
    pub owner: String,
    pub note: String,
    pub sharer: String,
    pub inserted: i64,
}

pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    owner: &str,
    note: &str,
    sharer: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO feed (owner, note, sharer, inserted) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(owner, note, sharer) DO NOTHING
        "#,
    )
    .bind(owner)
    .bind(note)
    .bind(sharer)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn delete_for_share(
    tx: &mut Transaction<'_, Sqlite>,
    note: &str,
    sharer: &str,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM feed WHERE note = ?1 AND sharer = ?2")
        .bind(note)
        .bind(sharer)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn list_for_owner(
    tx: &mut Transaction<'_, Sqlite>,
    owner: &str,
    limit: i64,
) -> Result<Vec<FeedEntry>, Error> {
    let entries = sqlx::query_as::<_, FeedEntry>(
        "SELECT * FROM feed WHERE owner = ?1 ORDER BY inserted DESC LIMIT ?2",
    )
    .bind(owner)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(entries)
}
