//! Periodic background jobs. Each runs on its own interval, independent of
//! the inbox/outbox drain loops, and is started once from `main`.

pub mod deleter;
pub mod feed_updater;
pub mod gc;
pub mod mover;
pub mod poller;
pub mod syncer;

use std::time::Duration;

use activitypub_federation::config::Data;
use tokio_util::sync::CancellationToken;

use crate::env::Env;

/// Runs `job` on a fixed interval until `shutdown` fires, logging (never
/// propagating) any error so one bad tick doesn't kill the scheduler.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    data: Data<Env>,
    shutdown: CancellationToken,
    job: F,
) where
    F: Fn(Data<Env>) -> Fut,
    Fut: std::future::Future<Output = Result<(), crate::error::Error>>,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(job = name, "periodic job shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {
                if let Err(err) = job(data.clone()).await {
                    tracing::warn!(job = name, error = %err, "periodic job tick failed");
                }
            }
        }
    }
}
