use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct Follow {
    pub follower: String,
    pub followed: String,
    pub follow_id: String,
    pub accepted: Option<bool>,
    pub inserted: i64,
}

pub async fn find(
    tx: &mut Transaction<'_, Sqlite>,
    follower: &str,
    followed: &str,
) -> Result<Option<Follow>, Error> {
    let follow = sqlx::query_as::<_, Follow>(
        "SELECT * FROM follows WHERE follower = ?1 AND followed = ?2",
    )
    .bind(follower)
    .bind(followed)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(follow)
}

pub async fn find_by_follow_id(
    tx: &mut Transaction<'_, Sqlite>,
    follow_id: &str,
) -> Result<Option<Follow>, Error> {
    let follow = sqlx::query_as::<_, Follow>("SELECT * FROM follows WHERE follow_id = ?1")
        .bind(follow_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(follow)
}

pub async fn list_followers(
    tx: &mut Transaction<'_, Sqlite>,
    followed: &str,
) -> Result<Vec<Follow>, Error> {
    let follows = sqlx::query_as::<_, Follow>(
        "SELECT * FROM follows WHERE followed = ?1 AND accepted = 1",
    )
    .bind(followed)
    .fetch_all(&mut **tx)
    .await?;
    Ok(follows)
}

pub async fn list_following_remote_actor(
    tx: &mut Transaction<'_, Sqlite>,
    followed: &str,
) -> Result<Vec<Follow>, Error> {
    let follows = sqlx::query_as::<_, Follow>("SELECT * FROM follows WHERE followed = ?1")
        .bind(followed)
        .fetch_all(&mut **tx)
        .await?;
    Ok(follows)
}

pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    follower: &str,
    followed: &str,
    follow_id: &str,
    accepted: Option<bool>,
) -> Result<Follow, Error> {
    let now = chrono::Utc::now().timestamp();
    let follow = sqlx::query_as::<_, Follow>(
        r#"
        INSERT INTO follows (follower, followed, follow_id, accepted, inserted)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(follower)
    .bind(followed)
    .bind(follow_id)
    .bind(accepted)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(follow)
}

pub async fn set_accepted(
    tx: &mut Transaction<'_, Sqlite>,
    follower: &str,
    followed: &str,
    accepted: bool,
) -> Result<u64, Error> {
    let result =
        sqlx::query("UPDATE follows SET accepted = ?1 WHERE follower = ?2 AND followed = ?3")
            .bind(accepted)
            .bind(follower)
            .bind(followed)
            .execute(&mut **tx)
            .await?;
    Ok(result.rows_affected())
}

pub async fn delete(
    tx: &mut Transaction<'_, Sqlite>,
    follower: &str,
    followed: &str,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM follows WHERE follower = ?1 AND followed = ?2")
        .bind(follower)
        .bind(followed)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
