use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

/// A post, or a poll vote when `name` is set and `content` is empty.
#[derive(Clone, Debug, FromRow)]
pub struct Note {
    pub id: String,
    pub author: String,
    pub host: String,
    pub content: String,
    pub in_reply_to: Option<String>,
    pub to_json: String,
    pub cc_json: String,
    pub published: i64,
    pub updated: Option<i64>,
    pub name: Option<String>,
    pub any_of_json: Option<String>,
    pub end_time: Option<i64>,
    pub closed: Option<i64>,
    pub voters_count: i64,
    pub deleted: bool,
    pub bookmarked: bool,
}

impl Note {
    pub fn is_poll_vote(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty()) && self.content.is_empty()
    }

    pub fn is_poll(&self) -> bool {
        self.any_of_json.is_some()
    }

    pub fn to(&self) -> Vec<String> {
        serde_json::from_str(&self.to_json).unwrap_or_default()
    }

    pub fn cc(&self) -> Vec<String> {
        serde_json::from_str(&self.cc_json).unwrap_or_default()
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PollOption {
    pub name: String,
    pub replies: i64,
}

pub async fn find_by_id(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Option<Note>, Error> {
    let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?1 AND deleted = 0")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(note)
}

pub async fn find_open_polls(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Note>, Error> {
    let notes = sqlx::query_as::<_, Note>(
        "SELECT * FROM notes WHERE any_of_json IS NOT NULL AND closed IS NULL AND deleted = 0",
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(notes)
}

/// Counts one vote per distinct voter per option, per the resolved Open
/// Question (no synthetic outer-join rows).
pub async fn tally_poll_votes(
    tx: &mut Transaction<'_, Sqlite>,
    poll_id: &str,
    option_name: &str,
) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT author)
        FROM notes
        WHERE in_reply_to = ?1 AND name = ?2 AND deleted = 0
        "#,
    )
    .bind(poll_id)
    .bind(option_name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count.0)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    author: &str,
    host: &str,
    content: &str,
    in_reply_to: Option<&str>,
    to: &[String],
    cc: &[String],
    published: i64,
    name: Option<&str>,
    any_of: Option<&[PollOption]>,
    end_time: Option<i64>,
) -> Result<Note, Error> {
    let to_json = serde_json::to_string(to)?;
    let cc_json = serde_json::to_string(cc)?;
    let any_of_json = any_of.map(serde_json::to_string).transpose()?;

    let note = sqlx::query_as::<_, Note>(
        r#"
        INSERT INTO notes (
            id, author, host, content, in_reply_to, to_json, cc_json,
            published, name, any_of_json, end_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(author)
    .bind(host)
    .bind(content)
    .bind(in_reply_to)
    .bind(&to_json)
    .bind(&cc_json)
    .bind(published)
    .bind(name)
    .bind(&any_of_json)
    .bind(end_time)
    .fetch_one(&mut **tx)
    .await?;

    if !content.is_empty() {
        sqlx::query("INSERT INTO notes_fts (id, content) VALUES (?1, ?2)")
            .bind(id)
            .bind(content)
            .execute(&mut **tx)
            .await?;
    }

    Ok(note)
}

pub async fn update_content(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    content: &str,
    updated: i64,
) -> Result<Option<Note>, Error> {
    let note = sqlx::query_as::<_, Note>(
        "UPDATE notes SET content = ?1, updated = ?2 WHERE id = ?3 AND deleted = 0 RETURNING *",
    )
    .bind(content)
    .bind(updated)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    if note.is_some() {
        sqlx::query("UPDATE notes_fts SET content = ?1 WHERE id = ?2")
            .bind(content)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(note)
}

/// Updates poll tally fields; called only by the Poller job.
pub async fn update_poll_tally(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    any_of: &[PollOption],
    voters_count: i64,
    updated: i64,
    closed: Option<i64>,
) -> Result<(), Error> {
    let any_of_json = serde_json::to_string(any_of)?;
    sqlx::query(
        "UPDATE notes SET any_of_json = ?1, voters_count = ?2, updated = ?3, closed = ?4 WHERE id = ?5",
    )
    .bind(&any_of_json)
    .bind(voters_count)
    .bind(updated)
    .bind(closed)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_deleted(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<(), Error> {
    sqlx::query("UPDATE notes SET deleted = 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM notes_fts WHERE id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM feed WHERE note = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn find_replies_to_local_root(
    tx: &mut Transaction<'_, Sqlite>,
    root_author_host: &str,
) -> Result<Vec<Note>, Error> {
    let notes = sqlx::query_as::<_, Note>(
        r#"
        SELECT n.* FROM notes n
        JOIN notes root ON n.in_reply_to = root.id
        JOIN actors a ON root.author = a.id
        WHERE a.is_local = 1 AND a.host = ?1 AND n.deleted = 0
        "#,
    )
    .bind(root_author_host)
    .fetch_all(&mut **tx)
    .await?;
    Ok(notes)
}

pub async fn notes_published_since(
    tx: &mut Transaction<'_, Sqlite>,
    since: i64,
) -> Result<Vec<Note>, Error> {
    let notes = sqlx::query_as::<_, Note>(
        "SELECT * FROM notes WHERE published >= ?1 AND deleted = 0 ORDER BY published ASC",
    )
    .bind(since)
    .fetch_all(&mut **tx)
    .await?;
    Ok(notes)
}

pub async fn notes_older_than(
    tx: &mut Transaction<'_, Sqlite>,
    author: &str,
    cutoff: i64,
) -> Result<Vec<Note>, Error> {
    let notes = sqlx::query_as::<_, Note>(
        "SELECT * FROM notes WHERE author = ?1 AND published < ?2 AND bookmarked = 0 AND deleted = 0",
    )
    .bind(author)
    .bind(cutoff)
    .fetch_all(&mut **tx)
    .await?;
    Ok(notes)
}
