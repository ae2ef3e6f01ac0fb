use activitypub_federation::config::Data;

use crate::env::Env;
use crate::error::Error;
use crate::models::{actor, follow};

/// For every remote actor our local users follow that has since set
/// `moved_to`, resolves the new identity, checks it really claims the old
/// one in `alsoKnownAs`, and migrates each such follower: `Follow(new)`
/// plus `Unfollow(old)`, or just the `Unfollow` if the follower already
/// follows the new identity by some other means.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let moved = actor::find_by_moved_to_not_null(&mut tx).await?;
    tx.commit().await?;

    for old_actor in moved {
        if old_actor.is_local {
            // Local accounts announce their own move via the outbox
            // builder (§4.3); nothing for this job to reconcile.
            continue;
        }
        let Some(moved_to) = old_actor.moved_to.clone() else {
            continue;
        };

        let new_actor = match env.resolver.resolve_id(&data, &moved_to, 0).await {
            Ok(a) => a,
            Err(err) => {
                tracing::warn!(old = %old_actor.id, new = %moved_to, error = %err, "could not resolve move target");
                continue;
            }
        };
        if !new_actor.also_known_as().iter().any(|aka| aka == &old_actor.id) {
            tracing::warn!(old = %old_actor.id, new = %new_actor.id, "move target does not list old identity in alsoKnownAs, skipping migration");
            continue;
        }

        let mut tx = env.store.begin().await?;
        let followers = follow::list_following_remote_actor(&mut tx, &old_actor.id).await?;
        tx.commit().await?;

        for f in followers {
            let mut tx = env.store.begin().await?;
            let follower = match actor::find_by_id(&mut tx, &f.follower).await? {
                Some(a) if a.is_local => a,
                _ => {
                    tx.commit().await?;
                    continue;
                }
            };
            let already_follows_new =
                follow::find(&mut tx, &follower.id, &new_actor.id).await?.is_some();
            tx.commit().await?;

            if !already_follows_new {
                if let Err(err) = crate::activities::follow::follow(env, &follower.id, &new_actor.id).await {
                    tracing::warn!(follower = %follower.id, target = %new_actor.id, error = %err, "mover could not queue follow of move target");
                }
            }
            if let Err(err) = crate::activities::follow::unfollow(env, &follower.id, &old_actor.id).await {
                tracing::warn!(follower = %follower.id, old = %old_actor.id, error = %err, "mover could not queue unfollow of moved actor");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use activitypub_federation::config::FederationConfig;

    use super::*;
    use crate::models::actor::{self, ActorKind};
    use crate::test_support::test_env;

    #[tokio::test]
    async fn migrates_followers_of_a_moved_actor() {
        let env = test_env("example.test").await;
        let federation_config = FederationConfig::builder()
            .domain(env.config.domain.clone())
            .app_data(env.clone())
            .build()
            .await
            .unwrap();
        let data = federation_config.to_request_data();

        let mut tx = env.store.begin().await.unwrap();
        let local_follower = actor::create_local(&mut tx, &env.config, "alice", "alice", ActorKind::Person, false, None, None)
            .await
            .unwrap();
        let old_remote = actor::upsert_remote(
            &mut tx,
            "https://remote.test/user/old",
            "remote.test",
            "old",
            "old",
            "",
            None,
            ActorKind::Person,
            "https://remote.test/user/old/inbox",
            None,
            "https://remote.test/user/old/followers",
            "https://remote.test/user/old#main-key",
            "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----",
            &[],
            None,
            false,
        )
        .await
        .unwrap();
        let new_remote = actor::upsert_remote(
            &mut tx,
            "https://remote.test/user/new",
            "remote.test",
            "new",
            "new",
            "",
            None,
            ActorKind::Person,
            "https://remote.test/user/new/inbox",
            None,
            "https://remote.test/user/new/followers",
            "https://remote.test/user/new#main-key",
            "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----",
            &[old_remote.id.clone()],
            None,
            false,
        )
        .await
        .unwrap();
        actor::set_moved_to(&mut tx, &old_remote.id, &new_remote.id).await.unwrap();
        crate::models::follow::insert(&mut tx, &local_follower.id, &old_remote.id, "https://example.test/follow/1", Some(true))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        tick(data).await.unwrap();

        let mut tx = env.store.begin().await.unwrap();
        assert!(crate::models::follow::find(&mut tx, &local_follower.id, &old_remote.id)
            .await
            .unwrap()
            .is_none());
        assert!(crate::models::follow::find(&mut tx, &local_follower.id, &new_remote.id)
            .await
            .unwrap()
            .is_some());
    }
}
