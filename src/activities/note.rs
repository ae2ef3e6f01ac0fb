use activitypub_federation::fetch::object_id::ObjectId;

use super::{parse_url, public_to_cc};
use crate::activitypub::{Create, Delete, NoteWire, Update};
use crate::config;
use crate::env::Env;
use crate::error::Error;
use crate::ids::{self, Kind};
use crate::models::note::PollOption;
use crate::models::{actor, note, outbox_item};

/// Publishes a new post (or poll) from a local actor: inserts the row,
/// wraps it in a `Create`, and queues delivery. Enforces the outbox depth
/// cap so one runaway caller can't starve the delivery workers.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    env: &Env,
    author_id: &str,
    content: &str,
    in_reply_to: Option<&str>,
    poll_options: Option<&[String]>,
    poll_duration: Option<chrono::Duration>,
) -> Result<note::Note, Error> {
    let mut tx = env.store.begin().await?;
    let author = actor::find_by_id(&mut tx, author_id)
        .await?
        .ok_or_else(|| Error::NotFound("author".into()))?;

    let pending = outbox_item::pending_count(&mut tx, &author.id).await?;
    if pending >= i64::from(env.config.max_delivery_queue_size) {
        return Err(Error::DeliveryQueueFull);
    }

    let id = ids::mint(&env.config.domain, Kind::Note);
    let (to, cc) = public_to_cc(&author.followers);
    let now = chrono::Utc::now().timestamp();
    let any_of: Option<Vec<PollOption>> = poll_options.map(|opts| {
        opts.iter()
            .map(|name| PollOption {
                name: name.clone(),
                replies: 0,
            })
            .collect()
    });
    let end_time = poll_duration.map(|d| now + d.num_seconds());

    let note = note::insert(
        &mut tx, &id, &author.id, &env.config.domain, content, in_reply_to, &to, &cc, now, None,
        any_of.as_deref(), end_time,
    )
    .await?;

    let tags = crate::models::hashtag::extract(content);
    crate::models::hashtag::replace_for_note(&mut tx, &note.id, &tags).await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let wire = to_wire(&note, &author.id)?;
    let activity = Create::new(ObjectId::parse(&author.id)?, wire, parse_url(&activity_id)?);
    let body = serde_json::to_value(&activity)?;
    outbox_item::enqueue(&mut tx, &activity_id, &author.id, &body).await?;
    tx.commit().await?;
    Ok(note)
}

/// Casts a vote on an open poll: a zero-content `Note` naming the chosen
/// option, addressed only to the poll's author (never fanned out further).
pub async fn vote(env: &Env, voter_id: &str, poll_id: &str, option: &str) -> Result<note::Note, Error> {
    let mut tx = env.store.begin().await?;
    let voter = actor::find_by_id(&mut tx, voter_id)
        .await?
        .ok_or_else(|| Error::NotFound("voter".into()))?;
    let poll = note::find_by_id(&mut tx, poll_id)
        .await?
        .ok_or_else(|| Error::NotFound("poll".into()))?;
    if poll.closed.is_some() {
        return Err(Error::Validation("poll is closed".into()));
    }

    let id = ids::mint(&env.config.domain, Kind::Note);
    let now = chrono::Utc::now().timestamp();
    let to = vec![poll.author.clone()];
    let vote_note = note::insert(
        &mut tx, &id, &voter.id, &env.config.domain, "", Some(poll_id), &to, &[], now,
        Some(option), None, None,
    )
    .await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let wire = to_wire(&vote_note, &voter.id)?;
    let activity = Create::new(ObjectId::parse(&voter.id)?, wire, parse_url(&activity_id)?);
    let body = serde_json::to_value(&activity)?;
    outbox_item::enqueue(&mut tx, &activity_id, &voter.id, &body).await?;
    tx.commit().await?;
    Ok(vote_note)
}

/// Edits a post's content, throttled to at most one edit per
/// `edit_throttle_unit * edit_throttle_factor` since it was published.
pub async fn edit(env: &Env, note_id: &str, content: &str) -> Result<note::Note, Error> {
    let mut tx = env.store.begin().await?;
    let existing = note::find_by_id(&mut tx, note_id)
        .await?
        .ok_or_else(|| Error::NotFound("note".into()))?;

    let age = chrono::Utc::now().timestamp() - existing.published;
    let min_age = (config_throttle_seconds(&env.config) as f64 * env.config.edit_throttle_factor) as i64;
    if age < min_age {
        return Err(Error::Validation("edited too soon after publish".into()));
    }

    let author = actor::find_by_id(&mut tx, &existing.author)
        .await?
        .ok_or_else(|| Error::NotFound("author".into()))?;
    let now = chrono::Utc::now().timestamp();
    let updated = note::update_content(&mut tx, note_id, content, now)
        .await?
        .ok_or_else(|| Error::NotFound("note".into()))?;

    let tags = crate::models::hashtag::extract(content);
    crate::models::hashtag::replace_for_note(&mut tx, note_id, &tags).await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let wire = to_wire(&updated, &author.id)?;
    let activity = Update::new(ObjectId::parse(&author.id)?, wire, parse_url(&activity_id)?);
    let body = serde_json::to_value(&activity)?;
    outbox_item::enqueue(&mut tx, &activity_id, &author.id, &body).await?;
    tx.commit().await?;
    Ok(updated)
}

fn config_throttle_seconds(cfg: &config::Config) -> i64 {
    cfg.edit_throttle_unit.as_secs() as i64
}

/// Deletes a post: tombstones it locally, cancels any unsent `Create` for
/// it (it never needs to go out now that it's gone), and queues a
/// `Delete` so followers drop their copies too.
pub async fn delete(env: &Env, note_id: &str) -> Result<(), Error> {
    let mut tx = env.store.begin().await?;
    let existing = note::find_by_id(&mut tx, note_id)
        .await?
        .ok_or_else(|| Error::NotFound("note".into()))?;
    let author = actor::find_by_id(&mut tx, &existing.author)
        .await?
        .ok_or_else(|| Error::NotFound("author".into()))?;

    note::mark_deleted(&mut tx, note_id).await?;
    outbox_item::mark_sent_for_note_creates(&mut tx, note_id).await?;

    let activity_id = ids::mint(&env.config.domain, Kind::Activity);
    let (to, cc) = public_to_cc(&author.followers);
    let activity = Delete::new(
        ObjectId::parse(&author.id)?,
        parse_url(note_id)?,
        parse_url(&activity_id)?,
        to,
        cc,
    );
    let body = serde_json::to_value(&activity)?;
    outbox_item::enqueue(&mut tx, &activity_id, &author.id, &body).await?;
    tx.commit().await?;
    Ok(())
}

fn to_wire(note: &note::Note, author_id: &str) -> Result<NoteWire, Error> {
    let any_of = note
        .any_of_json
        .as_deref()
        .map(serde_json::from_str::<Vec<PollOption>>)
        .transpose()?
        .map(|opts| {
            opts.into_iter()
                .map(|o| crate::activitypub::PollOptionWire {
                    name: o.name,
                    kind: "Note".to_string(),
                    replies: crate::activitypub::RepliesCount {
                        kind: "Collection".to_string(),
                        total_items: o.replies,
                    },
                })
                .collect()
        });

    Ok(NoteWire {
        id: ObjectId::parse(&note.id)?,
        kind: Default::default(),
        attributed_to: ObjectId::parse(author_id)?,
        content: note.content.clone(),
        in_reply_to: note.in_reply_to.as_deref().and_then(|s| s.parse().ok()),
        to: note.to(),
        cc: note.cc(),
        published: chrono::DateTime::from_timestamp(note.published, 0).unwrap_or_default().to_rfc3339(),
        updated: note
            .updated
            .map(|u| chrono::DateTime::from_timestamp(u, 0).unwrap_or_default().to_rfc3339()),
        name: note.name.clone(),
        any_of,
        end_time: note
            .end_time
            .map(|t| chrono::DateTime::from_timestamp(t, 0).unwrap_or_default().to_rfc3339()),
    })
}
