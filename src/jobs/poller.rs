use activitypub_federation::config::Data;

use crate::env::Env;
use crate::error::Error;
use crate::models::note::{self, PollOption};

/// Recomputes every open poll's per-option tally and closes any poll whose
/// `end_time` has passed.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let polls = note::find_open_polls(&mut tx).await?;
    tx.commit().await?;

    for poll in polls {
        retally_poll_inner(&data, &poll.id).await?;
    }
    Ok(())
}

/// Recomputes a single poll's tally; called directly when a vote arrives
/// so a poll's numbers are fresh without waiting for the next tick.
pub async fn retally_poll(data: &Data<Env>, poll_id: &str) -> Result<(), Error> {
    retally_poll_inner(data, poll_id).await
}

async fn retally_poll_inner(data: &Data<Env>, poll_id: &str) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let Some(poll) = note::find_by_id(&mut tx, poll_id).await? else {
        tx.commit().await?;
        return Ok(());
    };
    let Some(any_of_json) = poll.any_of_json.as_deref() else {
        tx.commit().await?;
        return Ok(());
    };
    let options: Vec<PollOption> = serde_json::from_str(any_of_json)?;

    let mut tallied = Vec::with_capacity(options.len());
    let mut total = 0i64;
    for option in &options {
        let count = note::tally_poll_votes(&mut tx, poll_id, &option.name).await?;
        total += count;
        tallied.push(PollOption {
            name: option.name.clone(),
            replies: count,
        });
    }

    let now = chrono::Utc::now().timestamp();
    let closed = poll.end_time.filter(|end| *end <= now);
    note::update_poll_tally(&mut tx, poll_id, &tallied, total, now, closed).await?;
    tx.commit().await?;
    Ok(())
}
