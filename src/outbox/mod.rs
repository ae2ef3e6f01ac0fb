//! Outbox delivery: claims queued activities, works out who they're
//! addressed to, and hands each one to the federation crate's signing and
//! HTTP delivery machinery.

pub mod delivery;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use activitypub_federation::config::Data;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::activitypub::AcceptedActivities;
use crate::config::{DELIVERY_WORKERS_GLOBAL, DELIVERY_WORKERS_PER_HOST};
use crate::env::Env;
use crate::error::Error;
use crate::models::{actor, delivery_attempt, outbox_item};

const BATCH_SIZE: i64 = 32;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Bounds how many deliveries run at once: a global cap across the whole
/// process, and a per-host cap so one slow or chatty instance can't starve
/// deliveries queued for everyone else.
struct WorkerPool {
    global: Arc<Semaphore>,
    per_host: std::sync::Mutex<HashMap<String, Arc<Semaphore>>>,
}

static POOL: OnceLock<WorkerPool> = OnceLock::new();

fn pool() -> &'static WorkerPool {
    POOL.get_or_init(|| WorkerPool {
        global: Arc::new(Semaphore::new(DELIVERY_WORKERS_GLOBAL)),
        per_host: std::sync::Mutex::new(HashMap::new()),
    })
}

fn host_semaphore(host: &str) -> Arc<Semaphore> {
    let mut map = pool().per_host.lock().expect("worker pool mutex poisoned");
    map.entry(host.to_string())
        .or_insert_with(|| Arc::new(Semaphore::new(DELIVERY_WORKERS_PER_HOST)))
        .clone()
}

pub async fn run(data: Data<Env>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("outbox delivery loop shutting down");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(err) = drain_once(&data).await {
                    tracing::warn!(error = %err, "outbox drain batch failed");
                }
            }
        }
    }
}

async fn drain_once(data: &Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let items = {
        let mut tx = env.store.begin().await?;
        let items = outbox_item::claim_batch(&mut tx, BATCH_SIZE).await?;
        tx.commit().await?;
        items
    };

    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let data = data.clone();
        let permit = pool()
            .global
            .clone()
            .acquire_owned()
            .await
            .expect("global delivery semaphore never closes");
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            deliver_one(&data, item).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn deliver_one(data: &Data<Env>, item: outbox_item::OutboxItem) {
    let env = data.app_data();

    let mut tx = match env.store.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!(error = %err, "failed to open transaction for outbox item");
            return;
        }
    };
    if let Err(err) = outbox_item::mark_attempted(&mut tx, &item.id).await {
        tracing::error!(error = %err, "failed to record delivery attempt");
    }
    if let Err(err) = tx.commit().await {
        tracing::error!(error = %err, "failed to commit delivery attempt marker");
        return;
    }

    if let Err(err) = deliver(data, &item).await {
        tracing::warn!(error = %err, activity = %item.id, "outbox delivery failed");
        return;
    }

    let mut tx = match env.store.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!(error = %err, "failed to open transaction finishing outbox item");
            return;
        }
    };
    if let Err(err) = outbox_item::mark_sent(&mut tx, &item.id, false).await {
        tracing::error!(error = %err, "failed to mark outbox item sent");
    }
    if let Err(err) = tx.commit().await {
        tracing::error!(error = %err, "failed to commit outbox item completion");
    }
}

async fn deliver(data: &Data<Env>, item: &outbox_item::OutboxItem) -> Result<(), Error> {
    let activity: AcceptedActivities = serde_json::from_str(&item.activity_json)?;
    let value: serde_json::Value = serde_json::from_str(&item.activity_json)?;
    let audience = audience_of(&value);

    let mut tx = data.app_data().store.begin().await?;
    let sender = actor::find_by_id(&mut tx, &item.sender)
        .await?
        .ok_or_else(|| Error::NotFound("sender actor".into()))?;
    tx.commit().await?;

    let inbox_urls = delivery::recipients(data, &sender, &audience).await?;
    if inbox_urls.is_empty() {
        return Ok(());
    }

    for inbox in &inbox_urls {
        let mut tx = data.app_data().store.begin().await?;
        delivery_attempt::find_or_create(&mut tx, &item.id, inbox.as_str()).await?;
        tx.commit().await?;
    }

    let mut by_host: HashMap<String, Vec<Url>> = HashMap::new();
    for inbox in &inbox_urls {
        let host = inbox.host_str().unwrap_or("unknown").to_string();
        by_host.entry(host).or_default().push(inbox.clone());
    }

    let results = futures_util::future::join_all(by_host.into_iter().map(|(host, urls)| {
        let sender = sender.clone();
        let activity = activity.clone();
        async move {
            let _permit = host_semaphore(&host)
                .acquire_owned()
                .await
                .expect("per-host delivery semaphore never closes");
            let result = sender.send(activity, urls.clone(), true, data).await;
            (urls, result)
        }
    }))
    .await;

    let mut any_err = None;
    for (urls, result) in &results {
        for inbox in urls {
            let mut tx = data.app_data().store.begin().await?;
            match result {
                Ok(()) => delivery_attempt::mark_delivered(&mut tx, &item.id, inbox.as_str()).await?,
                Err(err) => {
                    delivery_attempt::schedule_retry(&mut tx, &item.id, inbox.as_str(), item.attempts, &err.to_string())
                        .await?
                }
            }
            tx.commit().await?;
        }
        if let Err(err) = result {
            any_err.get_or_insert_with(|| Error::Transient(err.to_string()));
        }
    }

    match any_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn audience_of(value: &serde_json::Value) -> Vec<String> {
    let mut out = Vec::new();
    for key in ["to", "cc"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => out.push(s.clone()),
            Some(serde_json::Value::Array(items)) => {
                for item in items {
                    if let Some(s) = item.as_str() {
                        out.push(s.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    out
}
