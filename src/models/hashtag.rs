use sqlx::{FromRow, Sqlite, Transaction};

use crate::error::Error;

#[derive(Clone, Debug, FromRow)]
pub struct Hashtag {
    pub note: String,
    pub tag: String,
}

/// Extracts `#tag` tokens from plain-rendered content; the HTML⇄plain
/// conversion itself is an external collaborator.
pub fn extract(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .map(|tag| tag.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub async fn replace_for_note(
    tx: &mut Transaction<'_, Sqlite>,
    note: &str,
    tags: &[String],
) -> Result<(), Error> {
    sqlx::query("DELETE FROM hashtags WHERE note = ?1")
        .bind(note)
        .execute(&mut **tx)
        .await?;
    for tag in tags {
        sqlx::query("INSERT INTO hashtags (note, tag) VALUES (?1, ?2)")
            .bind(note)
            .bind(tag)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn notes_for_tag(
    tx: &mut Transaction<'_, Sqlite>,
    tag: &str,
    limit: i64,
) -> Result<Vec<String>, Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT note FROM hashtags WHERE tag = ?1 ORDER BY note DESC LIMIT ?2",
    )
    .bind(tag)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
