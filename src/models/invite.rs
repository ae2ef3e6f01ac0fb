use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct Invite {
    pub ed25519_privkey: String,
    pub by: Option<String>,
    pub used_by: Option<String>,
    pub created: i64,
}

pub async fn count_by_inviter(
    tx: &mut Transaction<'_, Sqlite>,
    by: &str,
) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invites WHERE by = ?1")
        .bind(by)
        .fetch_one(&mut **tx)
        .await?;
    Ok(count.0)
}

pub async fn create(
    tx: &mut Transaction<'_, Sqlite>,
    by: Option<&str>,
) -> Result<Invite, Error> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let privkey_hex = hex::encode(signing_key.to_bytes());
    let now = chrono::Utc::now().timestamp();

    let invite = sqlx::query_as::<_, Invite>(
        "INSERT INTO invites (ed25519_privkey, by, created) VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(&privkey_hex)
    .bind(by)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(invite)
}

pub async fn find_unused(
    tx: &mut Transaction<'_, Sqlite>,
    ed25519_privkey: &str,
) -> Result<Option<Invite>, Error> {
    let invite = sqlx::query_as::<_, Invite>(
        "SELECT * FROM invites WHERE ed25519_privkey = ?1 AND used_by IS NULL",
    )
    .bind(ed25519_privkey)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(invite)
}

pub async fn mark_used(
    tx: &mut Transaction<'_, Sqlite>,
    ed25519_privkey: &str,
    used_by: &str,
) -> Result<(), Error> {
    sqlx::query("UPDATE invites SET used_by = ?1 WHERE ed25519_privkey = ?2")
        .bind(used_by)
        .bind(ed25519_privkey)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
