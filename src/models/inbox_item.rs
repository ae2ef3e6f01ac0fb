use sqlx::{FromRow, Sqlite, Transaction};
use uuid::Uuid;

use crate::config;
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboxState {
    Staged,
    InProgress,
    Done,
    FailedPermanent,
    BackOff,
}

impl InboxState {
    fn as_str(self) -> &'static str {
        match self {
            InboxState::Staged => "staged",
            InboxState::InProgress => "in-progress",
            InboxState::Done => "done",
            InboxState::FailedPermanent => "failed-permanent",
            InboxState::BackOff => "back-off",
        }
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct InboxItem {
    pub id: String,
    pub sender_key_id: String,
    pub activity_json: String,
    pub received: i64,
    pub attempts: i64,
    pub next_attempt: i64,
    pub state: String,
    pub processed_activity_id: Option<String>,
}

pub async fn stage(
    tx: &mut Transaction<'_, Sqlite>,
    sender_key_id: &str,
    activity_json: &str,
    processed_activity_id: Option<&str>,
) -> Result<InboxItem, Error> {
    let now = chrono::Utc::now().timestamp();
    let id = Uuid::now_v7().to_string();
    let item = sqlx::query_as::<_, InboxItem>(
        r#"
        INSERT INTO inbox (id, sender_key_id, activity_json, received, next_attempt, processed_activity_id)
        VALUES (?1, ?2, ?3, ?4, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(sender_key_id)
    .bind(activity_json)
    .bind(now)
    .bind(processed_activity_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(item)
}

pub async fn already_processed(
    tx: &mut Transaction<'_, Sqlite>,
    activity_id: &str,
) -> Result<bool, Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM inbox WHERE processed_activity_id = ?1 AND state = 'done'",
    )
    .bind(activity_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.is_some())
}

pub async fn claim_batch(
    tx: &mut Transaction<'_, Sqlite>,
    limit: i64,
) -> Result<Vec<InboxItem>, Error> {
    let now = chrono::Utc::now().timestamp();
    let items = sqlx::query_as::<_, InboxItem>(
        r#"
        SELECT * FROM inbox
        WHERE state IN ('staged', 'back-off') AND next_attempt <= ?1
        ORDER BY received ASC
        LIMIT ?2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    for item in &items {
        sqlx::query("UPDATE inbox SET state = 'in-progress' WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(items)
}

pub async fn mark_done(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    processed_activity_id: Option<&str>,
) -> Result<(), Error> {
    sqlx::query(
        "UPDATE inbox SET state = 'done', processed_activity_id = COALESCE(?1, processed_activity_id) WHERE id = ?2",
    )
    .bind(processed_activity_id)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Schedules the next retry with exponential backoff, capping at
/// `MaxDeliveryDelay` and promoting to `failed-permanent` past the
/// configured attempt limit.
pub async fn mark_back_off(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    attempts: i64,
) -> Result<(), Error> {
    let state = if attempts >= i64::from(config::INBOX_RETRY_MAX_ATTEMPTS) {
        InboxState::FailedPermanent
    } else {
        InboxState::BackOff
    };
    let delay_secs = (config::DELIVERY_BACKOFF_BASE.as_secs() as i64 * 2i64.pow(attempts as u32))
        .min(config::MAX_DELIVERY_DELAY.as_secs() as i64);
    let next_attempt = chrono::Utc::now().timestamp() + delay_secs;

    sqlx::query(
        "UPDATE inbox SET state = ?1, attempts = ?2, next_attempt = ?3 WHERE id = ?4",
    )
    .bind(state.as_str())
    .bind(attempts)
    .bind(next_attempt)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
