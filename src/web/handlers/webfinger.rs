use activitypub_federation::config::Data;
use activitypub_federation::fetch::webfinger::{build_webfinger_response, extract_webfinger_name};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::env::Env;
use crate::error::Error;
use crate::models::actor;

#[derive(Deserialize)]
pub struct WebfingerQuery {
    resource: String,
}

/// `/.well-known/webfinger?resource=acct:name@domain` — the only way a
/// remote server discovers a local actor's ActivityPub id before it has
/// ever seen one of our activities.
pub async fn webfinger(
    Query(query): Query<WebfingerQuery>,
    data: Data<Env>,
) -> Result<impl IntoResponse, Error> {
    let name = extract_webfinger_name(&query.resource, &data).map_err(Error::from)?;

    let mut tx = data.app_data().store.begin().await?;
    let found = actor::find_local_by_username(&mut tx, name).await?;
    tx.commit().await?;

    match found {
        Some(local) => {
            let url: url::Url = local.id.parse()?;
            Ok(Json(build_webfinger_response(query.resource, url)).into_response())
        }
        None => Ok((StatusCode::NOT_FOUND, "actor not found").into_response()),
    }
}
