use activitypub_federation::fetch::object_id::ObjectId;

use super::parse_url;
use crate::activitypub::{Announce as AnnounceWire, Undo, Undoable};
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::{actor, feed, note, outbox_item, share};

/// Boosts a note into the sharer's own followers' feeds and announces it
/// to the fediverse.
pub async fn announce(env: &Env, sharer_id: &str, note_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let sharer = actor::find_by_id(&mut tx, sharer_id)
        .await?
        .ok_or_else(|| Error::NotFound("actor".into()))?;
    let target = note::find_by_id(&mut tx, note_id)
        .await?
        .ok_or_else(|| Error::NotFound("note".into()))?;

    if share::find(&mut tx, note_id, sharer_id).await?.is_some() {
        return Err(Error::Conflict("already shared".into()));
    }
    share::insert(&mut tx, note_id, sharer_id).await?;
    feed::insert(&mut tx, sharer_id, note_id, sharer_id).await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let to = vec!["https://www.w3.org/ns/activitystreams#Public".to_string()];
    let cc = vec![sharer.followers.clone()];
    let activity = AnnounceWire::new(
        ObjectId::parse(&sharer.id)?,
        ObjectId::parse(&target.id)?,
        parse_url(&activity_id)?,
        to,
        cc,
    );
    let body = serde_json::to_value(&activity)?;
    outbox_item::enqueue(&mut tx, &activity_id, &sharer.id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Un-boosts: drops the share and the derived feed entries, and queues an
/// `Undo(Announce)`.
pub async fn unannounce(env: &Env, sharer_id: &str, note_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let existing = share::find(&mut tx, note_id, sharer_id)
        .await?
        .ok_or_else(|| Error::NotFound("share".into()))?;
    share::delete(&mut tx, note_id, sharer_id).await?;
    feed::delete_for_share(&mut tx, note_id, sharer_id).await?;
    let _ = existing;

    let undo_id = ids::mint(&env.config.domain, Kind::Activity);
    let original_id = ids::mint(&env.config.domain, Kind::Activity);
    let undo = Undo {
        actor: ObjectId::parse(sharer_id)?,
        object: Undoable::Announce(AnnounceWire::new(
            ObjectId::parse(sharer_id)?,
            ObjectId::parse(note_id)?,
            parse_url(&original_id)?,
            vec![],
            vec![],
        )),
        kind: Default::default(),
        id: parse_url(&undo_id)?,
    };
    let body = serde_json::to_value(&undo)?;
    outbox_item::enqueue(&mut tx, &undo_id, sharer_id, &body).await?;
    tx.commit().await?;
    Ok(())
}
