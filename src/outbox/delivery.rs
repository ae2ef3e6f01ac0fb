use std::collections::HashSet;

use activitypub_federation::config::Data;
use url::Url;

use crate::env::Env;
use crate::error::Error;
use crate::models::actor::Actor;
use crate::models::follow;

const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Works out who an outgoing activity actually needs to be POSTed to, from
/// its `to`/`cc` audience fields: the sender's own followers collection
/// expands to one inbox per follower (deduped onto shared inboxes where a
/// remote host exposes one), and any other addressee is resolved and
/// delivered to directly.
pub async fn recipients(data: &Data<Env>, sender: &Actor, audience: &[String]) -> Result<Vec<Url>, Error> {
    let env = data.app_data();
    let mut inboxes: HashSet<String> = HashSet::new();

    for entry in audience {
        if entry == PUBLIC {
            continue;
        }
        if entry == &sender.followers {
            let mut tx = env.store.begin().await?;
            let followers = follow::list_followers(&mut tx, &sender.id).await?;
            tx.commit().await?;
            for f in &followers {
                let mut tx = env.store.begin().await?;
                if let Some(follower) = crate::models::actor::find_by_id(&mut tx, &f.follower).await? {
                    if !follower.is_local {
                        inboxes.insert(follower.shared_inbox.unwrap_or(follower.inbox));
                    }
                }
                tx.commit().await?;
            }
            continue;
        }

        match env.resolver.resolve_id(data, entry, 0).await {
            Ok(actor) if !actor.is_local => {
                inboxes.insert(actor.inbox);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(addressee = %entry, error = %err, "could not resolve delivery recipient");
            }
        }
    }

    inboxes
        .into_iter()
        .filter(|inbox| match Url::parse(inbox).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) if env.blocklist.is_blocked(&host) => {
                tracing::debug!(%host, "dropping blocklisted delivery recipient");
                false
            }
            _ => true,
        })
        .map(|s| s.parse().map_err(Error::from))
        .collect()
}
