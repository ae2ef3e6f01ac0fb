use activitypub_federation::config::Data;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::env::Env;
use crate::error::Error;
use crate::models::{actor, follow, outbox_item};

const CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
const PAGE_SIZE: i64 = 40;

#[derive(Serialize)]
struct OrderedCollection {
    #[serde(rename = "@context")]
    context: &'static str,
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    total_items: i64,
    ordered_items: Vec<Value>,
}

/// `GET /followers/{name}`: the collection a remote server's `Follow`
/// addresses and that `Announce`/`Create` activities cite as audience.
/// Only accepted followers are listed; pending requests stay invisible.
pub async fn followers(
    Path(name): Path<String>,
    data: Data<Env>,
) -> Result<impl IntoResponse, Error> {
    let mut tx = data.app_data().store.begin().await?;
    let Some(owner) = actor::find_local_by_username(&mut tx, &name).await? else {
        tx.commit().await?;
        return Ok((StatusCode::NOT_FOUND, "actor not found").into_response());
    };
    let followers = follow::list_followers(&mut tx, &owner.id).await?;
    tx.commit().await?;

    let items: Vec<Value> = followers
        .into_iter()
        .take(PAGE_SIZE as usize)
        .map(|f| Value::String(f.follower))
        .collect();
    let collection = OrderedCollection {
        context: CONTEXT,
        id: owner.followers.clone(),
        kind: "OrderedCollection",
        total_items: items.len() as i64,
        ordered_items: items,
    };
    Ok(Json(collection).into_response())
}

/// `GET /outbox/{name}`: the public activities a local actor has sent,
/// newest first, truncated to one page. Used by remote servers doing an
/// initial crawl of an account's history.
pub async fn outbox(
    Path(name): Path<String>,
    data: Data<Env>,
) -> Result<impl IntoResponse, Error> {
    let mut tx = data.app_data().store.begin().await?;
    let Some(owner) = actor::find_local_by_username(&mut tx, &name).await? else {
        tx.commit().await?;
        return Ok((StatusCode::NOT_FOUND, "actor not found").into_response());
    };
    let sent = outbox_item::recent_public_for_sender(&mut tx, &owner.id, PAGE_SIZE).await?;
    tx.commit().await?;

    let items: Vec<Value> = sent
        .into_iter()
        .filter_map(|item| serde_json::from_str(&item.activity_json).ok())
        .collect();
    let collection = OrderedCollection {
        context: CONTEXT,
        id: format!("https://{}/outbox/{name}", data.app_data().config.domain),
        kind: "OrderedCollection",
        total_items: items.len() as i64,
        ordered_items: items,
    };
    Ok(Json(collection).into_response())
}
