use activitypub_federation::axum::json::FederationJson;
use activitypub_federation::config::Data;
use activitypub_federation::protocol::context::WithContext;
use activitypub_federation::traits::Object;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::env::Env;
use crate::error::Error;
use crate::models::note;

const CONTEXT: [&str; 2] = [
    "https://www.w3.org/ns/activitystreams",
    "https://w3id.org/security/v1",
];

/// Serves a local note at `/note/:id`, matching the `https://{domain}/note/{uuid}`
/// id minted by [`crate::ids::mint`] for every post and poll.
pub async fn get_note(Path(id_suffix): Path<String>, data: Data<Env>) -> Result<impl IntoResponse, Error> {
    let id = format!("https://{}/note/{id_suffix}", data.app_data().config.domain);
    let mut tx = data.app_data().store.begin().await?;
    let found = note::find_by_id(&mut tx, &id).await?;
    tx.commit().await?;

    match found {
        Some(n) if !n.deleted => {
            let wire = n.into_json(&data).await?;
            let with_context = WithContext::new(wire, context_value());
            Ok(FederationJson(with_context).into_response())
        }
        _ => Ok((StatusCode::NOT_FOUND, "note not found").into_response()),
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
