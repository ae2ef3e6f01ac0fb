//! Inbox drain loop: activities are staged into the `inbox` table at HTTP
//! receipt time (after signature verification), then processed here in a
//! background loop so a slow or misbehaving receive handler can never
//! block the sender's request.

pub mod forward;

use std::time::Duration;

use activitypub_federation::config::Data;
use activitypub_federation::traits::ActivityHandler;
use tokio_util::sync::CancellationToken;

use crate::activitypub::AcceptedActivities;
use crate::env::Env;
use crate::error::Error;
use crate::models::inbox_item;

const BATCH_SIZE: i64 = 32;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Runs until `shutdown` is cancelled, repeatedly claiming a batch of
/// staged inbox rows and processing each one to completion.
pub async fn run(data: Data<Env>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("inbox drain loop shutting down");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(err) = drain_once(&data).await {
                    tracing::warn!(error = %err, "inbox drain batch failed");
                }
            }
        }
    }
}

async fn drain_once(data: &Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let items = {
        let mut tx = env.store.begin().await?;
        let items = inbox_item::claim_batch(&mut tx, BATCH_SIZE).await?;
        tx.commit().await?;
        items
    };

    for item in items {
        process_one(data, item).await;
    }
    Ok(())
}

async fn process_one(data: &Data<Env>, item: inbox_item::InboxItem) {
    let env = data.app_data();
    let result = process_activity(data, &item.activity_json).await;

    let mut tx = match env.store.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!(error = %err, "failed to open transaction while finishing inbox item");
            return;
        }
    };

    match result {
        Ok(activity_id) => {
            if let Err(err) = inbox_item::mark_done(&mut tx, &item.id, activity_id.as_deref()).await {
                tracing::error!(error = %err, "failed to mark inbox item done");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, inbox_item = %item.id, "inbox item failed, backing off");
            if let Err(mark_err) = inbox_item::mark_back_off(&mut tx, &item.id, item.attempts + 1).await {
                tracing::error!(error = %mark_err, "failed to schedule inbox retry");
            }
        }
    }
    if let Err(err) = tx.commit().await {
        tracing::error!(error = %err, "failed to commit inbox item transition");
    }
}

/// Parses and dispatches one staged activity, returning its
/// ActivityStreams id on success so the caller can record it for dedup.
async fn process_activity(data: &Data<Env>, activity_json: &str) -> Result<Option<String>, Error> {
    let activity: AcceptedActivities = serde_json::from_str(activity_json)?;
    let activity_id = activity.id().to_string();

    {
        let mut tx = data.app_data().store.begin().await?;
        if inbox_item::already_processed(&mut tx, &activity_id).await? {
            tx.commit().await?;
            return Ok(Some(activity_id));
        }
        tx.commit().await?;
    }

    activity.verify(data).await?;
    activity.receive(data).await?;
    Ok(Some(activity_id))
}
