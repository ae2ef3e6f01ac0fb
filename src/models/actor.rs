use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::config::Config;
use crate::error::Error;
use crate::ids::{self, Kind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Person,
    Group,
    Service,
    Application,
}

impl ActorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorKind::Person => "Person",
            ActorKind::Group => "Group",
            ActorKind::Service => "Service",
            ActorKind::Application => "Application",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Person" => Some(ActorKind::Person),
            "Group" => Some(ActorKind::Group),
            "Service" => Some(ActorKind::Service),
            "Application" => Some(ActorKind::Application),
            _ => None,
        }
    }
}

/// A federated identity, local or remote. See the data model for field
/// semantics; local-only columns are `None` for remote actors.
#[derive(Clone, Debug, FromRow)]
pub struct Actor {
    pub id: String,
    pub host: String,
    pub preferred_username: String,
    pub name: String,
    pub summary: String,
    pub icon_url: Option<String>,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub inbox: String,
    pub shared_inbox: Option<String>,
    pub followers: String,
    pub public_key_id: String,
    pub public_key_pem: String,
    pub assertion_key_id: Option<String>,
    pub assertion_public_key: Option<String>,
    pub also_known_as: String,
    pub moved_to: Option<String>,
    pub manually_approves_followers: bool,
    pub suspended: bool,
    pub updated: i64,
    pub private_key_pem: Option<String>,
    pub assertion_private_key: Option<String>,
    pub client_cert_hash: Option<String>,
    pub ttl_days: Option<i64>,
    pub invited_by: Option<String>,
    pub is_local: bool,
    pub created: i64,
}

impl Actor {
    pub fn kind(&self) -> ActorKind {
        ActorKind::parse(&self.kind).unwrap_or(ActorKind::Person)
    }

    pub fn also_known_as(&self) -> Vec<String> {
        serde_json::from_str(&self.also_known_as).unwrap_or_default()
    }
}

pub async fn find_by_id(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Actor>, Error> {
    let actor = sqlx::query_as::<_, Actor>("SELECT * FROM actors WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(actor)
}

pub async fn find_local_by_username(
    tx: &mut Transaction<'_, Sqlite>,
    preferred_username: &str,
) -> Result<Option<Actor>, Error> {
    let actor = sqlx::query_as::<_, Actor>(
        "SELECT * FROM actors WHERE preferred_username = ?1 AND is_local = 1",
    )
    .bind(preferred_username)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(actor)
}

pub async fn list_local_with_ttl(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Actor>, Error> {
    let actors = sqlx::query_as::<_, Actor>(
        "SELECT * FROM actors WHERE is_local = 1 AND ttl_days IS NOT NULL",
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(actors)
}

pub async fn list_all_local(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Actor>, Error> {
    let actors = sqlx::query_as::<_, Actor>("SELECT * FROM actors WHERE is_local = 1")
        .fetch_all(&mut **tx)
        .await?;
    Ok(actors)
}

pub async fn find_remote_stale(tx: &mut Transaction<'_, Sqlite>, cutoff: i64) -> Result<Vec<Actor>, Error> {
    let actors = sqlx::query_as::<_, Actor>(
        "SELECT * FROM actors WHERE is_local = 0 AND updated < ?1",
    )
    .bind(cutoff)
    .fetch_all(&mut **tx)
    .await?;
    Ok(actors)
}

pub async fn find_by_moved_to_not_null(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Actor>, Error> {
    let actors = sqlx::query_as::<_, Actor>("SELECT * FROM actors WHERE moved_to IS NOT NULL")
        .fetch_all(&mut **tx)
        .await?;
    Ok(actors)
}

pub async fn find_by_moved_to(
    tx: &mut Transaction<'_, Sqlite>,
    moved_to: &str,
) -> Result<Vec<Actor>, Error> {
    let actors = sqlx::query_as::<_, Actor>("SELECT * FROM actors WHERE moved_to = ?1")
        .bind(moved_to)
        .fetch_all(&mut **tx)
        .await?;
    Ok(actors)
}

#[allow(clippy::too_many_arguments)]
pub async fn create_local(
    tx: &mut Transaction<'_, Sqlite>,
    config: &Config,
    preferred_username: &str,
    name: &str,
    kind: ActorKind,
    manually_approves_followers: bool,
    ttl_days: Option<i64>,
    invited_by: Option<&str>,
) -> Result<Actor, Error> {
    use activitypub_federation::http_signatures::generate_actor_keypair;

    let id = ids::mint(&config.domain, Kind::User);
    let keypair =
        generate_actor_keypair().map_err(|e| Error::Fatal(format!("keypair generation: {e}")))?;
    let inbox = format!("{id}/inbox");
    let shared_inbox = format!("https://{}/inbox", config.domain);
    let followers = format!("{id}/followers");
    let public_key_id = format!("{id}#main-key");
    let now = chrono::Utc::now().timestamp();

    let actor = sqlx::query_as::<_, Actor>(
        r#"
        INSERT INTO actors (
            id, host, preferred_username, name, summary, icon_url, type,
            inbox, shared_inbox, followers, public_key_id, public_key_pem,
            also_known_as, manually_approves_followers, suspended, updated,
            private_key_pem, ttl_days, invited_by, is_local, created
        ) VALUES (
            ?1, ?2, ?3, ?4, '', NULL, ?5,
            ?6, ?7, ?8, ?9, ?10,
            '[]', ?11, 0, ?12,
            ?13, ?14, ?15, 1, ?12
        )
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&config.domain)
    .bind(preferred_username)
    .bind(name)
    .bind(kind.as_str())
    .bind(&inbox)
    .bind(&shared_inbox)
    .bind(&followers)
    .bind(&public_key_id)
    .bind(&keypair.public_key)
    .bind(manually_approves_followers)
    .bind(now)
    .bind(&keypair.private_key)
    .bind(ttl_days)
    .bind(invited_by)
    .fetch_one(&mut **tx)
    .await?;

    Ok(actor)
}

/// Upserts a remote actor document fetched by the resolver, merging
/// derived fields rather than blindly overwriting local bookkeeping.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_remote(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    host: &str,
    preferred_username: &str,
    name: &str,
    summary: &str,
    icon_url: Option<&str>,
    kind: ActorKind,
    inbox: &str,
    shared_inbox: Option<&str>,
    followers: &str,
    public_key_id: &str,
    public_key_pem: &str,
    also_known_as: &[String],
    moved_to: Option<&str>,
    manually_approves_followers: bool,
) -> Result<Actor, Error> {
    let now = chrono::Utc::now().timestamp();
    let also_known_as_json = serde_json::to_string(also_known_as)?;

    let actor = sqlx::query_as::<_, Actor>(
        r#"
        INSERT INTO actors (
            id, host, preferred_username, name, summary, icon_url, type,
            inbox, shared_inbox, followers, public_key_id, public_key_pem,
            also_known_as, moved_to, manually_approves_followers, suspended,
            updated, is_local, created
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0, ?16, 0, ?16)
        ON CONFLICT(id) DO UPDATE SET
            preferred_username = excluded.preferred_username,
            name = excluded.name,
            summary = excluded.summary,
            icon_url = excluded.icon_url,
            type = excluded.type,
            inbox = excluded.inbox,
            shared_inbox = excluded.shared_inbox,
            followers = excluded.followers,
            public_key_id = excluded.public_key_id,
            public_key_pem = excluded.public_key_pem,
            also_known_as = excluded.also_known_as,
            moved_to = excluded.moved_to,
            manually_approves_followers = excluded.manually_approves_followers,
            updated = excluded.updated
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(host)
    .bind(preferred_username)
    .bind(name)
    .bind(summary)
    .bind(icon_url)
    .bind(kind.as_str())
    .bind(inbox)
    .bind(shared_inbox)
    .bind(followers)
    .bind(public_key_id)
    .bind(public_key_pem)
    .bind(&also_known_as_json)
    .bind(moved_to)
    .bind(manually_approves_followers)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(actor)
}

pub async fn set_moved_to(
    tx: &mut Transaction<'_, Sqlite>,
    actor_id: &str,
    moved_to: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE actors SET moved_to = ?1, updated = ?2 WHERE id = ?3")
        .bind(moved_to)
        .bind(now)
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn update_local_icon(
    tx: &mut Transaction<'_, Sqlite>,
    actor_id: &str,
    icon_url: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE actors SET icon_url = ?1, updated = ?2 WHERE id = ?3 AND is_local = 1")
        .bind(icon_url)
        .bind(now)
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn update_local_profile(
    tx: &mut Transaction<'_, Sqlite>,
    actor_id: &str,
    name: &str,
    summary: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "UPDATE actors SET name = ?1, summary = ?2, updated = ?3 WHERE id = ?4 AND is_local = 1",
    )
    .bind(name)
    .bind(summary)
    .bind(now)
    .bind(actor_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn delete(tx: &mut Transaction<'_, Sqlite>, actor_id: &str) -> Result<(), Error> {
    sqlx::query("DELETE FROM actors WHERE id = ?1")
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
