use activitypub_federation::config::Data;

use crate::env::Env;
use crate::error::Error;
use crate::models::{actor, feed, follow, note};

/// Fans newly published local posts out into each follower's feed. Run as
/// a periodic sweep rather than inline with post creation so a burst of
/// posts from a popular local account doesn't stall the request that
/// created them.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let cutoff = chrono::Utc::now().timestamp() - 10 * 60;
    let recent = note::notes_published_since(&mut tx, cutoff).await?;
    tx.commit().await?;

    for n in recent {
        if n.in_reply_to.is_some() || n.is_poll_vote() {
            continue;
        }
        let mut tx = env.store.begin().await?;
        let Some(author) = actor::find_by_id(&mut tx, &n.author).await? else {
            tx.commit().await?;
            continue;
        };
        if author.is_local {
            feed::insert(&mut tx, &author.id, &n.id, &author.id).await?;
        }
        let followers = follow::list_followers(&mut tx, &n.author).await?;
        for f in &followers {
            if let Some(owner) = actor::find_by_id(&mut tx, &f.follower).await? {
                if owner.is_local {
                    feed::insert(&mut tx, &owner.id, &n.id, &n.author).await?;
                }
            }
        }
        tx.commit().await?;
    }
    Ok(())
}
