use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;
use activitypub_federation::fetch::webfinger::webfinger_resolve_actor;

use crate::config;
use crate::env::Env;
use crate::error::Error;
use crate::models::actor::Actor;

/// Resolves remote actors by id or `user@host` handle, fronting the store
/// as a TTL cache the way the teacher's own actor lookups front Postgres:
/// check the row we already have before reaching for the network, and
/// refuse to recurse past a fixed depth so a `moved_to` chain (or a
/// misbehaving remote server) can't spin the resolver forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Resolver
    }

    /// Looks up an actor by its canonical id, using the stored row if it's
    /// still within `RESOLVER_CACHE_TTL`, otherwise dereferencing over the
    /// network via [`ObjectId::dereference`] (which itself calls
    /// `Actor::read_from_id`/`verify`/`from_json` under the hood).
    pub async fn resolve_id(&self, data: &Data<Env>, id: &str, depth: u32) -> Result<Actor, Error> {
        if depth > config::RESOLVER_DEPTH_LIMIT {
            return Err(Error::too_deep());
        }

        let host = crate::ids::domain_of(id).ok_or_else(|| Error::Validation("malformed actor id".into()))?;
        if data.app_data().blocklist.is_blocked(host) {
            return Err(Error::blocked(host));
        }

        {
            let mut tx = data.app_data().store.begin().await?;
            if let Some(actor) = crate::models::actor::find_by_id(&mut tx, id).await? {
                let now = chrono::Utc::now().timestamp();
                let fresh = now - actor.updated < config::RESOLVER_CACHE_TTL.as_secs() as i64;
                if actor.is_local || fresh {
                    tx.commit().await?;
                    return Ok(actor);
                }
            }
        }

        let object_id = ObjectId::<Actor>::parse(id)?;
        let actor = object_id.dereference(data).await?;
        Ok(actor)
    }

    /// Resolves a `user@host` handle via WebFinger, then defers to
    /// [`Resolver::resolve_id`] for the actual actor document.
    pub async fn resolve_handle(&self, data: &Data<Env>, user: &str, host: &str) -> Result<Actor, Error> {
        if data.app_data().blocklist.is_blocked(host) {
            return Err(Error::blocked(host));
        }

        let actor = webfinger_resolve_actor::<Env, Actor>(&format!("{user}@{host}"), data)
            .await
            .map_err(Error::from)?;
        Ok(actor)
    }
}
