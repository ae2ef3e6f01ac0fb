use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;
use activitypub_federation::traits::Object;

use crate::activitypub::Create;
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::note::Note;
use crate::models::{actor, outbox_item};

/// When a reply lands whose thread root is one of our local posts, we
/// forward it on to the root author's followers — they may not otherwise
/// ever see a reply from a server they don't themselves follow. Recursion
/// is capped at `max_forwarding_depth` so a deep or cyclic `inReplyTo`
/// chain can't be used to amplify a single message indefinitely.
pub async fn forward_reply_if_local_root(
    data: &Data<Env>,
    reply: &Note,
    parent_id: &str,
    depth: u32,
) -> Result<(), Error> {
    if depth as u64 >= data.app_data().config.max_forwarding_depth as u64 {
        return Ok(());
    }

    let mut tx = data.app_data().store.begin().await?;
    let parent = match crate::models::note::find_by_id(&mut tx, parent_id).await? {
        Some(p) => p,
        None => {
            tx.commit().await?;
            return Ok(());
        }
    };
    let root_author = actor::find_by_id(&mut tx, &parent.author).await?;
    tx.commit().await?;

    let Some(root_author) = root_author else {
        return Ok(());
    };

    if !root_author.is_local {
        if let Some(grandparent) = &parent.in_reply_to {
            return Box::pin(forward_reply_if_local_root(data, reply, grandparent, depth + 1)).await;
        }
        return Ok(());
    }

    let mut tx = data.app_data().store.begin().await?;
    let author = actor::find_by_id(&mut tx, &reply.author).await?;
    tx.commit().await?;
    let Some(author) = author else {
        return Ok(());
    };

    let forward_id = ids::mint(&data.app_data().config.domain, Kind::Activity);
    let reply_wire = crate::activitypub::NoteWire {
        id: ObjectId::parse(&reply.id)?,
        kind: Default::default(),
        attributed_to: ObjectId::parse(&author.id)?,
        content: reply.content.clone(),
        in_reply_to: Some(parent_id.parse()?),
        to: reply.to(),
        cc: reply.cc(),
        published: chrono::DateTime::from_timestamp(reply.published, 0).unwrap_or_default().to_rfc3339(),
        updated: None,
        name: reply.name.clone(),
        any_of: None,
        end_time: None,
    };
    let forward = Create::new(ObjectId::parse(&author.id)?, reply_wire, forward_id.parse()?);
    let body = serde_json::to_value(&forward)?;

    let mut tx = data.app_data().store.begin().await?;
    outbox_item::enqueue(&mut tx, &forward_id, &root_author.id, &body).await?;
    tx.commit().await?;
    Ok(())
}
