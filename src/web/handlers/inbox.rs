use activitypub_federation::axum::inbox::{receive_activity, ActivityData};
use activitypub_federation::config::Data;
use activitypub_federation::protocol::context::WithContext;
use axum::response::IntoResponse;

use crate::activitypub::AcceptedActivities;
use crate::env::Env;
use crate::error::Error;
use crate::models::actor::Actor;

/// The shared inbox: one POST endpoint every remote server can deliver to
/// regardless of which local actor an activity is ultimately about.
/// Signature verification, body digest checking and JSON parsing all
/// happen inside [`receive_activity`]; by the time our `ActivityHandler`
/// impls run, the sender is already authenticated.
pub async fn shared_inbox(data: Data<Env>, activity_data: ActivityData) -> Result<impl IntoResponse, Error> {
    receive_activity::<WithContext<AcceptedActivities>, Actor, Env>(activity_data, &data)
        .await
        .map_err(Error::from)
}

/// Per-actor inbox. Functionally identical to the shared inbox; kept as a
/// separate route because some senders address actors directly rather
/// than their shared inbox.
pub async fn actor_inbox(data: Data<Env>, activity_data: ActivityData) -> Result<impl IntoResponse, Error> {
    shared_inbox(data, activity_data).await
}
