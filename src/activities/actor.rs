use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;
use activitypub_federation::traits::Object;

use super::parse_url;
use crate::activitypub::move_activity::Move as MoveWire;
use crate::activitypub::UpdateActor;
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::actor;

/// Edits a local actor's profile and broadcasts the updated actor document
/// to followers, wrapped in an `UpdateActor` the way Mastodon-compatible
/// servers announce avatar/bio changes.
pub async fn update_profile(
    env: &Env,
    data: &Data<Env>,
    actor_id: &str,
    name: &str,
    summary: &str,
) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    actor::update_local_profile(&mut tx, actor_id, name, summary).await?;
    let updated = actor::find_by_id(&mut tx, actor_id)
        .await?
        .ok_or_else(|| Error::NotFound("actor".into()))?;
    tx.commit().await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let wire = updated.clone().into_json(data).await?;
    let activity = UpdateActor::new(ObjectId::parse(&updated.id)?, wire, parse_url(&activity_id)?);
    let body = serde_json::to_value(&activity)?;

    let mut tx = env.store.begin().await?;
    crate::models::outbox_item::enqueue(&mut tx, &activity_id, &updated.id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Relocates a local actor to `target`: sets `movedTo` on this identity and
/// broadcasts a `Move` to its followers. The target is expected to already
/// list this actor in its own `alsoKnownAs` (set up on the other side
/// before this is called); remote followers verify that themselves on
/// receipt, and the `Mover` job re-verifies it before migrating anyone.
pub async fn move_to(env: &Env, actor_id: &str, target_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    actor::set_moved_to(&mut tx, actor_id, target_id).await?;
    tx.commit().await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let activity = MoveWire::new(
        ObjectId::parse(actor_id)?,
        ObjectId::parse(actor_id)?,
        ObjectId::parse(target_id)?,
        parse_url(&activity_id)?,
    );
    let body = serde_json::to_value(&activity)?;

    let mut tx = env.store.begin().await?;
    crate::models::outbox_item::enqueue(&mut tx, &activity_id, actor_id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Same broadcast as [`update_profile`], for a new avatar instead of a new
/// bio/name.
pub async fn update_icon(
    env: &Env,
    data: &Data<Env>,
    actor_id: &str,
    icon_url: &str,
) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    actor::update_local_icon(&mut tx, actor_id, icon_url).await?;
    let updated = actor::find_by_id(&mut tx, actor_id)
        .await?
        .ok_or_else(|| Error::NotFound("actor".into()))?;
    tx.commit().await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let wire = updated.clone().into_json(data).await?;
    let activity = UpdateActor::new(ObjectId::parse(&updated.id)?, wire, parse_url(&activity_id)?);
    let body = serde_json::to_value(&activity)?;

    let mut tx = env.store.begin().await?;
    crate::models::outbox_item::enqueue(&mut tx, &activity_id, &updated.id, &body).await?;
    tx.commit().await?;
    Ok(())
}
