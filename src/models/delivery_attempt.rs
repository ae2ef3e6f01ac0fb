use sqlx::{FromRow, Sqlite, Transaction};

use crate::config;
use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct DeliveryAttempt {
    pub activity: String,
    pub recipient_inbox: String,
    pub attempts: i64,
    pub next_attempt: i64,
    pub last_error_class: Option<String>,
    pub sent: bool,
    pub permanent_failure: bool,
}

pub async fn find_or_create(
    tx: &mut Transaction<'_, Sqlite>,
    activity: &str,
    recipient_inbox: &str,
) -> Result<DeliveryAttempt, Error> {
    if let Some(existing) = sqlx::query_as::<_, DeliveryAttempt>(
        "SELECT * FROM delivery_attempts WHERE activity = ?1 AND recipient_inbox = ?2",
    )
    .bind(activity)
    .bind(recipient_inbox)
    .fetch_optional(&mut **tx)
    .await?
    {
        return Ok(existing);
    }

    let now = chrono::Utc::now().timestamp();
    let attempt = sqlx::query_as::<_, DeliveryAttempt>(
        r#"
        INSERT INTO delivery_attempts (activity, recipient_inbox, next_attempt)
        VALUES (?1, ?2, ?3)
        RETURNING *
        "#,
    )
    .bind(activity)
    .bind(recipient_inbox)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(attempt)
}

pub async fn mark_delivered(
    tx: &mut Transaction<'_, Sqlite>,
    activity: &str,
    recipient_inbox: &str,
) -> Result<(), Error> {
    sqlx::query(
        "UPDATE delivery_attempts SET sent = 1 WHERE activity = ?1 AND recipient_inbox = ?2",
    )
    .bind(activity)
    .bind(recipient_inbox)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_permanent_failure(
    tx: &mut Transaction<'_, Sqlite>,
    activity: &str,
    recipient_inbox: &str,
    error_class: &str,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE delivery_attempts
        SET permanent_failure = 1, last_error_class = ?1
        WHERE activity = ?2 AND recipient_inbox = ?3
        "#,
    )
    .bind(error_class)
    .bind(activity)
    .bind(recipient_inbox)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Schedules the next retry at `now + base * 2^attempts`, jittered and
/// capped at `MaxDeliveryDelay`, and records the error classification.
pub async fn schedule_retry(
    tx: &mut Transaction<'_, Sqlite>,
    activity: &str,
    recipient_inbox: &str,
    attempts: i64,
    error_class: &str,
) -> Result<(), Error> {
    let base = config::DELIVERY_BACKOFF_BASE.as_secs() as i64;
    let jitter = rand::random::<i64>().rem_euclid(base.max(1));
    let delay = (base * 2i64.pow(attempts.clamp(0, 32) as u32) + jitter)
        .min(config::MAX_DELIVERY_DELAY.as_secs() as i64);
    let next_attempt = chrono::Utc::now().timestamp() + delay;

    sqlx::query(
        r#"
        UPDATE delivery_attempts
        SET attempts = ?1, next_attempt = ?2, last_error_class = ?3
        WHERE activity = ?4 AND recipient_inbox = ?5
        "#,
    )
    .bind(attempts)
    .bind(next_attempt)
    .bind(error_class)
    .bind(activity)
    .bind(recipient_inbox)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn all_terminal(
    tx: &mut Transaction<'_, Sqlite>,
    activity: &str,
) -> Result<bool, Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM delivery_attempts WHERE activity = ?1 AND sent = 0 AND permanent_failure = 0",
    )
    .bind(activity)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0 == 0)
}
