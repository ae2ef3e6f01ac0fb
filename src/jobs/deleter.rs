use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;

use crate::activities::parse_url;
use crate::activitypub::Delete;
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::{actor, note, outbox_item};

/// Enforces each local actor's configured retention window: posts older
/// than `actors.ttl_days` are tombstoned and a `Delete` is broadcast, the
/// same as an explicit user-initiated deletion.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let authors = actor::list_local_with_ttl(&mut tx).await?;
    tx.commit().await?;

    for author in authors {
        let Some(ttl_days) = author.ttl_days else {
            continue;
        };
        let cutoff = chrono::Utc::now().timestamp() - ttl_days * 24 * 60 * 60;

        let mut tx = env.store.begin().await?;
        let candidates = note::notes_older_than(&mut tx, &author.id, cutoff).await?;
        tx.commit().await?;

        for candidate in candidates {
            let mut tx = env.store.begin().await?;
            note::mark_deleted(&mut tx, &candidate.id).await?;
            outbox_item::mark_sent_for_note_creates(&mut tx, &candidate.id).await?;
            tx.commit().await?;

            let activity_id = ids::mint(&env.config.domain, Kind::Activity);
            let to = vec!["https://www.w3.org/ns/activitystreams#Public".to_string()];
            let cc = vec![author.followers.clone()];
            let activity = Delete::new(
                ObjectId::parse(&author.id)?,
                parse_url(&candidate.id)?,
                parse_url(&activity_id)?,
                to,
                cc,
            );
            let body = serde_json::to_value(&activity)?;
            let mut tx = env.store.begin().await?;
            outbox_item::enqueue(&mut tx, &activity_id, &author.id, &body).await?;
            tx.commit().await?;
        }
    }
    Ok(())
}
