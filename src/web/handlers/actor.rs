use activitypub_federation::axum::json::FederationJson;
use activitypub_federation::config::Data;
use activitypub_federation::protocol::context::WithContext;
use activitypub_federation::traits::Object;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::env::Env;
use crate::error::Error;
use crate::models::actor;

const CONTEXT: [&str; 2] = [
    "https://www.w3.org/ns/activitystreams",
    "https://w3id.org/security/v1",
];

/// Serves a local actor document at `/user/:id_or_name`. The path segment
/// is tried two ways: first as the opaque id suffix [`crate::ids::mint`]
/// gave the account at creation (what a remote `ObjectId::dereference`
/// actually fetches), then as its `preferredUsername` (the human-friendly
/// form a person would type or link to).
pub async fn get_actor(
    Path(id_or_name): Path<String>,
    data: Data<Env>,
) -> Result<impl IntoResponse, Error> {
    let id = format!("https://{}/user/{id_or_name}", data.app_data().config.domain);
    let mut tx = data.app_data().store.begin().await?;
    let found = match actor::find_by_id(&mut tx, &id).await? {
        Some(a) if a.is_local => Some(a),
        _ => actor::find_local_by_username(&mut tx, &id_or_name).await?,
    };
    tx.commit().await?;
    respond(found, &data).await
}

async fn respond(
    found: Option<actor::Actor>,
    data: &Data<Env>,
) -> Result<axum::response::Response, Error> {
    match found {
        Some(local) => {
            let wire = local.into_json(data).await?;
            let with_context = WithContext::new(wire, context_value());
            Ok(FederationJson(with_context).into_response())
        }
        None => Ok((StatusCode::NOT_FOUND, "actor not found").into_response()),
    }
}

fn context_value() -> serde_json::Value {
    serde_json::Value::Array(
        CONTEXT
            .into_iter()
            .map(|s| serde_json::Value::String(s.to_string()))
            .collect(),
    )
}
