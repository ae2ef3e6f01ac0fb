use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct OutboxItem {
    pub id: String,
    pub sender: String,
    pub activity_json: String,
    pub inserted: i64,
    pub sent: bool,
    pub failed: bool,
    pub attempts: i64,
    pub last_attempt: Option<i64>,
}

pub async fn pending_count(
    tx: &mut Transaction<'_, Sqlite>,
    sender: &str,
) -> Result<i64, Error> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM outbox WHERE sender = ?1 AND sent = 0")
            .bind(sender)
            .fetch_one(&mut **tx)
            .await?;
    Ok(count.0)
}

pub async fn enqueue(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    sender: &str,
    activity_json: &serde_json::Value,
) -> Result<OutboxItem, Error> {
    let now = chrono::Utc::now().timestamp();
    let body = serde_json::to_string(activity_json)?;
    let item = sqlx::query_as::<_, OutboxItem>(
        r#"
        INSERT INTO outbox (id, sender, activity_json, inserted)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(sender)
    .bind(&body)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(item)
}

/// Marks all unsent Create rows for a note as delivered, so a later
/// `Delete` doesn't race an in-flight delivery of the original post.
pub async fn mark_sent_for_note_creates(
    tx: &mut Transaction<'_, Sqlite>,
    note_id: &str,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE outbox SET sent = 1
        WHERE sent = 0
          AND json_extract(activity_json, '$.type') = 'Create'
          AND json_extract(activity_json, '$.object.id') = ?1
        "#,
    )
    .bind(note_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_follow_sent(
    tx: &mut Transaction<'_, Sqlite>,
    follow_id: &str,
) -> Result<(), Error> {
    sqlx::query("UPDATE outbox SET sent = 1 WHERE id = ?1")
        .bind(follow_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn claim_batch(
    tx: &mut Transaction<'_, Sqlite>,
    limit: i64,
) -> Result<Vec<OutboxItem>, Error> {
    let items = sqlx::query_as::<_, OutboxItem>(
        "SELECT * FROM outbox WHERE sent = 0 ORDER BY inserted ASC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(items)
}

pub async fn mark_attempted(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE outbox SET attempts = attempts + 1, last_attempt = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// The most recent publicly-addressed activities a sender has queued, for
/// serving `/outbox/{name}`. Includes undelivered and delivered rows alike
/// — the outbox collection reflects what was sent, not delivery status.
pub async fn recent_public_for_sender(
    tx: &mut Transaction<'_, Sqlite>,
    sender: &str,
    limit: i64,
) -> Result<Vec<OutboxItem>, Error> {
    let items = sqlx::query_as::<_, OutboxItem>(
        r#"
        SELECT * FROM outbox
        WHERE sender = ?1
          AND json_extract(activity_json, '$.to') LIKE '%Public%'
        ORDER BY inserted DESC
        LIMIT ?2
        "#,
    )
    .bind(sender)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(items)
}

pub async fn mark_sent(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    failed: bool,
) -> Result<(), Error> {
    sqlx::query("UPDATE outbox SET sent = 1, failed = ?1 WHERE id = ?2")
        .bind(failed)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
