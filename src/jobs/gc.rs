use activitypub_federation::config::Data;

use crate::env::Env;
use crate::error::Error;

const RETENTION: i64 = 7 * 24 * 60 * 60;

/// Prunes terminal rows (delivered/failed-permanent) from the inbox and
/// delivery-attempt tables once they're old enough that nothing will ever
/// look at them again, then drops remote actors nothing references any
/// more. The outbox and local actor/note rows are never garbage collected
/// here; they're the actual record of what happened.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    sweep(data.app_data()).await
}

async fn sweep(env: &Env) -> Result<(), Error> {
    let cutoff = chrono::Utc::now().timestamp() - RETENTION;

    let mut tx = env.store.begin().await?;
    let inbox_removed = sqlx::query(
        "DELETE FROM inbox WHERE state IN ('done', 'failed-permanent') AND received < ?1",
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let delivery_removed = sqlx::query(
        "DELETE FROM delivery_attempts WHERE (sent = 1 OR permanent_failure = 1) AND next_attempt < ?1",
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // A remote actor is orphaned once no local follow references it (either
    // direction), it authored nothing we still keep, and nothing delivered
    // to or from it recently enough to matter.
    let actors_removed = sqlx::query(
        r#"
        DELETE FROM actors
        WHERE is_local = 0
          AND updated < ?1
          AND NOT EXISTS (SELECT 1 FROM follows WHERE follower = actors.id OR followed = actors.id)
          AND NOT EXISTS (SELECT 1 FROM notes WHERE author = actors.id AND deleted = 0)
          AND NOT EXISTS (SELECT 1 FROM shares WHERE by = actors.id)
        "#,
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let notes_removed = sqlx::query(
        r#"
        DELETE FROM notes
        WHERE deleted = 1
          AND published < ?1
          AND NOT EXISTS (SELECT 1 FROM notes replies WHERE replies.in_reply_to = notes.id)
        "#,
    )
    .bind(cutoff)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    if inbox_removed > 0 || delivery_removed > 0 || actors_removed > 0 || notes_removed > 0 {
        tracing::info!(
            inbox_removed,
            delivery_removed,
            actors_removed,
            notes_removed,
            "gc sweep complete"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::{self, ActorKind};
    use crate::test_support::test_env;

    async fn make_stale_remote(env: &Env, username: &str) -> actor::Actor {
        let mut tx = env.store.begin().await.unwrap();
        let remote = actor::upsert_remote(
            &mut tx,
            &format!("https://remote.test/user/{username}"),
            "remote.test",
            username,
            username,
            "",
            None,
            ActorKind::Person,
            &format!("https://remote.test/user/{username}/inbox"),
            None,
            &format!("https://remote.test/user/{username}/followers"),
            &format!("https://remote.test/user/{username}#main-key"),
            "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----",
            &[],
            None,
            false,
        )
        .await
        .unwrap();
        sqlx::query("UPDATE actors SET updated = 0 WHERE id = ?1")
            .bind(&remote.id)
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        remote
    }

    #[tokio::test]
    async fn sweep_drops_unreferenced_stale_remote_actor() {
        let env = test_env("example.test").await;
        let ghost = make_stale_remote(&env, "ghost").await;

        sweep(&env).await.unwrap();

        let mut tx = env.store.begin().await.unwrap();
        assert!(actor::find_by_id(&mut tx, &ghost.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_keeps_stale_remote_actor_with_a_follow() {
        let env = test_env("example.test").await;
        let ghost = make_stale_remote(&env, "ghost").await;

        let mut tx = env.store.begin().await.unwrap();
        let local = actor::create_local(&mut tx, &env.config, "alice", "alice", ActorKind::Person, false, None, None)
            .await
            .unwrap();
        crate::models::follow::insert(&mut tx, &local.id, &ghost.id, "https://example.test/follow/1", Some(true))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        sweep(&env).await.unwrap();

        let mut tx = env.store.begin().await.unwrap();
        assert!(actor::find_by_id(&mut tx, &ghost.id).await.unwrap().is_some());
    }
}
