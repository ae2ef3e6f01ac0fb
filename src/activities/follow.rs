use activitypub_federation::fetch::object_id::ObjectId;

use super::parse_url;
use crate::activitypub::{Accept as AcceptWire, Follow as FollowWire, Reject as RejectWire, Undo, Undoable};
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::{actor, follow};

/// Starts following a remote or local actor: mints a `Follow` activity,
/// records the pending row, and queues it for delivery.
pub async fn follow(env: &Env, follower_id: &str, followed_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let follower = actor::find_by_id(&mut tx, follower_id)
        .await?
        .ok_or_else(|| Error::NotFound("follower".into()))?;
    let followed = actor::find_by_id(&mut tx, followed_id)
        .await?
        .ok_or_else(|| Error::NotFound("followed actor".into()))?;

    if follow::find(&mut tx, &follower.id, &followed.id).await?.is_some() {
        return Err(Error::Conflict("already following".into()));
    }

    let follow_id = ids::mint(&env.config.domain, Kind::Follow);
    follow::insert(&mut tx, &follower.id, &followed.id, &follow_id, None).await?;

    let activity = FollowWire::new(
        ObjectId::parse(&follower.id)?,
        ObjectId::parse(&followed.id)?,
        parse_url(&follow_id)?,
    );
    let body = serde_json::to_value(&activity)?;
    crate::models::outbox_item::enqueue(&mut tx, &follow_id, &follower.id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Unfollows, by wrapping the original `Follow` (looked up by its id) in an
/// `Undo` and queuing that instead. The local `follows` row is removed
/// immediately rather than waiting for a round trip.
pub async fn unfollow(env: &Env, follower_id: &str, followed_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let existing = follow::find(&mut tx, follower_id, followed_id)
        .await?
        .ok_or_else(|| Error::NotFound("follow".into()))?;
    follow::delete(&mut tx, follower_id, followed_id).await?;

    let undo_id = ids::mint(&env.config.domain, Kind::Activity);
    let undo = Undo {
        actor: ObjectId::parse(follower_id)?,
        object: Undoable::Follow(FollowWire::new(
            ObjectId::parse(follower_id)?,
            ObjectId::parse(followed_id)?,
            parse_url(&existing.follow_id)?,
        )),
        kind: Default::default(),
        id: parse_url(&undo_id)?,
    };
    let body = serde_json::to_value(&undo)?;
    crate::models::outbox_item::enqueue(&mut tx, &undo_id, follower_id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Approves a pending incoming follow request: flips `follows.accepted` to
/// true and queues the matching `Accept`. Used when `followed` has
/// `manuallyApprovesFollowers` set, so the automatic accept in the `Follow`
/// handler didn't already do this.
pub async fn accept(env: &Env, follower_id: &str, followed_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let existing = follow::find(&mut tx, follower_id, followed_id)
        .await?
        .ok_or_else(|| Error::NotFound("follow".into()))?;
    follow::set_accepted(&mut tx, follower_id, followed_id, true).await?;

    let accept_id = ids::mint(&env.config.domain, Kind::Activity);
    let accept = AcceptWire::new(
        ObjectId::parse(followed_id)?,
        FollowWire::new(
            ObjectId::parse(follower_id)?,
            ObjectId::parse(followed_id)?,
            parse_url(&existing.follow_id)?,
        ),
        parse_url(&accept_id)?,
    );
    let body = serde_json::to_value(&accept)?;
    crate::models::outbox_item::enqueue(&mut tx, &accept_id, followed_id, &body).await?;
    tx.commit().await?;
    Ok(())
}

/// Denies a pending incoming follow request: flips `follows.accepted` to
/// false and queues a `Reject`. Fails if there is no matching pending row.
pub async fn reject(env: &Env, follower_id: &str, followed_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let existing = follow::find(&mut tx, follower_id, followed_id)
        .await?
        .ok_or_else(|| Error::NotFound("follow".into()))?;
    if existing.accepted.is_some() {
        return Err(Error::Conflict("follow request is not pending".into()));
    }
    follow::set_accepted(&mut tx, follower_id, followed_id, false).await?;

    let reject_id = ids::mint(&env.config.domain, Kind::Activity);
    let reject = RejectWire::new(
        ObjectId::parse(followed_id)?,
        FollowWire::new(
            ObjectId::parse(follower_id)?,
            ObjectId::parse(followed_id)?,
            parse_url(&existing.follow_id)?,
        ),
        parse_url(&reject_id)?,
    );
    let body = serde_json::to_value(&reject)?;
    crate::models::outbox_item::enqueue(&mut tx, &reject_id, followed_id, &body).await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::ActorKind;
    use crate::test_support::test_env;

    async fn make_actor(env: &Env, username: &str, manually_approves: bool) -> actor::Actor {
        let mut tx = env.store.begin().await.unwrap();
        let created = actor::create_local(
            &mut tx,
            &env.config,
            username,
            username,
            ActorKind::Person,
            manually_approves,
            None,
            None,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        created
    }

    #[tokio::test]
    async fn accept_flips_pending_follow_and_queues_accept() {
        let env = test_env("example.test").await;
        let alice = make_actor(&env, "alice", true).await;
        let bob = make_actor(&env, "bob", false).await;

        let mut tx = env.store.begin().await.unwrap();
        follow::insert(&mut tx, &bob.id, &alice.id, "https://remote.test/follow/1", None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        accept(&env, &bob.id, &alice.id).await.unwrap();

        let mut tx = env.store.begin().await.unwrap();
        let row = follow::find(&mut tx, &bob.id, &alice.id).await.unwrap().unwrap();
        assert_eq!(row.accepted, Some(true));
        let queued = crate::models::outbox_item::claim_batch(&mut tx, 10).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].sender, alice.id);
    }

    #[tokio::test]
    async fn reject_refuses_non_pending_follow() {
        let env = test_env("example.test").await;
        let alice = make_actor(&env, "alice", true).await;
        let bob = make_actor(&env, "bob", false).await;

        let mut tx = env.store.begin().await.unwrap();
        follow::insert(&mut tx, &bob.id, &alice.id, "https://remote.test/follow/2", Some(true))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = reject(&env, &bob.id, &alice.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
