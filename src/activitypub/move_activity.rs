use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;
use activitypub_federation::kinds::activity::MoveType;
use activitypub_federation::traits::ActivityHandler;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::env::Env;
use crate::error::Error;
use crate::models::actor::Actor;

/// An account migration: `object` (the old identity) points to `target`
/// (the new one). Recording the relocation here just sets `moved_to`; the
/// Mover job reconciles followers on its own schedule.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub actor: ObjectId<Actor>,
    pub object: ObjectId<Actor>,
    pub target: ObjectId<Actor>,
    #[serde(rename = "type")]
    pub kind: MoveType,
    pub id: Url,
}

impl Move {
    pub fn new(actor: ObjectId<Actor>, object: ObjectId<Actor>, target: ObjectId<Actor>, id: Url) -> Self {
        Move {
            actor,
            object,
            target,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Move {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        if self.actor.inner() != self.object.inner() {
            return Err(Error::Validation("move actor must be the moving identity".into()));
        }
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let old_actor = self.object.dereference(data).await?;
        let new_actor = self.target.dereference(data).await?;

        if !new_actor.also_known_as().iter().any(|aka| aka == &old_actor.id) {
            tracing::warn!(old = %old_actor.id, new = %new_actor.id, "move target does not list old identity in alsoKnownAs, ignoring");
            return Ok(());
        }

        // Only records the relocation here; migrating followers is the
        // periodic Mover job's responsibility (§4.6), so a burst of moves
        // doesn't block this receive handler.
        let mut tx = data.app_data().store.begin().await?;
        crate::models::actor::set_moved_to(&mut tx, &old_actor.id, &new_actor.id).await?;
        tx.commit().await?;
        Ok(())
    }
}
