//! Wire format and `activitypub_federation` trait glue: this is the only
//! module that knows what ActivityStreams JSON looks like. Everything else
//! in the crate works with the plain DB rows in [`crate::models`].

use activitypub_federation::config::Data;
use activitypub_federation::fetch::object_id::ObjectId;
use activitypub_federation::kinds::activity::{
    AcceptType, AnnounceType, CreateType, DeleteType, FollowType, RejectType, UndoType, UpdateType,
};
use activitypub_federation::kinds::object::NoteType;
use activitypub_federation::protocol::public_key::PublicKey;
use activitypub_federation::protocol::verification::verify_domains_match;
use activitypub_federation::traits::{ActivityHandler, Actor as ActivityPubFederationActor, Object};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::env::Env;
use crate::error::Error;
use crate::models::actor::{Actor, ActorKind};
use crate::models::note::{Note, PollOption};

pub mod move_activity;

/// `endpoints.sharedInbox`, the only endpoint this server reads or writes.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_inbox: Option<Url>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Image {
    #[serde(rename = "type", default = "default_image_type")]
    pub kind: String,
    pub url: Url,
}

fn default_image_type() -> String {
    "Image".to_string()
}

/// A person, group, service or application actor document. The four AS2
/// actor kinds share one shape on the wire, the same way the store keeps
/// one `actors` table instead of one per kind.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorWire {
    pub id: ObjectId<Actor>,
    #[serde(rename = "type")]
    pub kind: String,
    pub preferred_username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Image>,
    pub inbox: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Endpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Url>,
    pub public_key: PublicKey,
    #[serde(default)]
    pub also_known_as: Vec<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<Url>,
    #[serde(default)]
    pub manually_approves_followers: bool,
}

#[async_trait::async_trait]
impl Object for Actor {
    type DataType = Env;
    type Kind = ActorWire;
    type Error = Error;

    async fn read_from_id(object_id: Url, data: &Data<Self::DataType>) -> Result<Option<Self>, Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let actor = crate::models::actor::find_by_id(&mut tx, object_id.as_str()).await?;
        tx.commit().await?;
        Ok(actor)
    }

    async fn into_json(self, _data: &Data<Self::DataType>) -> Result<Self::Kind, Self::Error> {
        Ok(ActorWire {
            id: ObjectId::parse(&self.id)?,
            kind: self.kind().as_str().to_string(),
            preferred_username: self.preferred_username,
            name: self.name,
            summary: self.summary,
            icon: self.icon_url.and_then(|u| u.parse().ok()).map(|url| Image {
                kind: default_image_type(),
                url,
            }),
            inbox: self.inbox.parse()?,
            endpoints: self.shared_inbox.and_then(|s| s.parse().ok()).map(|shared_inbox| Endpoints {
                shared_inbox: Some(shared_inbox),
            }),
            followers: self.followers.parse().ok(),
            public_key: PublicKey {
                id: self.public_key_id,
                owner: self.id.parse()?,
                public_key_pem: self.public_key_pem,
            },
            also_known_as: self.also_known_as().iter().filter_map(|s| s.parse().ok()).collect(),
            moved_to: self.moved_to.as_deref().and_then(|s| s.parse().ok()),
            manually_approves_followers: self.manually_approves_followers,
        })
    }

    async fn verify(json: &Self::Kind, expected_domain: &Url, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        verify_domains_match(json.id.inner(), expected_domain).map_err(Error::from)
    }

    async fn from_json(json: Self::Kind, data: &Data<Self::DataType>) -> Result<Self, Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let id = json.id.inner().as_str();
        let host = crate::ids::domain_of(id).unwrap_or_default().to_string();
        let also_known_as: Vec<String> = json.also_known_as.iter().map(|u| u.to_string()).collect();
        let actor = crate::models::actor::upsert_remote(
            &mut tx,
            id,
            &host,
            &json.preferred_username,
            &json.name,
            &json.summary,
            json.icon.as_ref().map(|i| i.url.as_str()),
            ActorKind::parse(&json.kind).unwrap_or(ActorKind::Person),
            json.inbox.as_str(),
            json.endpoints.as_ref().and_then(|e| e.shared_inbox.as_ref()).map(Url::as_str),
            json.followers.as_ref().map(Url::as_str).unwrap_or(""),
            &json.public_key.id,
            &json.public_key.public_key_pem,
            &also_known_as,
            json.moved_to.as_ref().map(Url::as_str),
            json.manually_approves_followers,
        )
        .await?;
        tx.commit().await?;
        Ok(actor)
    }
}

impl ActivityPubFederationActor for Actor {
    fn id(&self) -> Url {
        self.id.parse().expect("stored actor id is a valid url")
    }

    fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    fn private_key_pem(&self) -> Option<String> {
        self.private_key_pem.clone()
    }

    fn inbox(&self) -> Url {
        self.inbox.parse().expect("stored inbox is a valid url")
    }

    fn shared_inbox(&self) -> Option<Url> {
        self.shared_inbox.as_deref().and_then(|s| s.parse().ok())
    }
}

/// One option of a poll, with its running tally. Mirrors Mastodon's
/// `oneOf`/`anyOf` Question convention, expressed as a plain `Note` with
/// `name` set to the chosen option the way the data model does it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionWire {
    pub name: String,
    #[serde(rename = "type", default = "default_note_type_str")]
    pub kind: String,
    pub replies: RepliesCount,
}

fn default_note_type_str() -> String {
    "Note".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RepliesCount {
    #[serde(rename = "type", default = "default_collection_type")]
    pub kind: String,
    pub total_items: i64,
}

fn default_collection_type() -> String {
    "Collection".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteWire {
    pub id: ObjectId<Note>,
    #[serde(rename = "type")]
    pub kind: NoteType,
    pub attributed_to: ObjectId<Actor>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Url>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub published: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<PollOptionWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

fn timestamp_to_rfc3339(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0).unwrap_or_default().to_rfc3339()
}

fn rfc3339_to_timestamp(s: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|d| d.timestamp())
        .unwrap_or_else(|_| chrono::Utc::now().timestamp())
}

#[async_trait::async_trait]
impl Object for Note {
    type DataType = Env;
    type Kind = NoteWire;
    type Error = Error;

    async fn read_from_id(object_id: Url, data: &Data<Self::DataType>) -> Result<Option<Self>, Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let note = crate::models::note::find_by_id(&mut tx, object_id.as_str()).await?;
        tx.commit().await?;
        Ok(note)
    }

    async fn into_json(self, _data: &Data<Self::DataType>) -> Result<Self::Kind, Self::Error> {
        let any_of = self
            .any_of_json
            .as_deref()
            .map(serde_json::from_str::<Vec<PollOption>>)
            .transpose()?
            .map(|opts| {
                opts.into_iter()
                    .map(|o| PollOptionWire {
                        name: o.name,
                        kind: default_note_type_str(),
                        replies: RepliesCount {
                            kind: default_collection_type(),
                            total_items: o.replies,
                        },
                    })
                    .collect()
            });

        Ok(NoteWire {
            id: ObjectId::parse(&self.id)?,
            kind: Default::default(),
            attributed_to: ObjectId::parse(&self.author)?,
            content: self.content,
            in_reply_to: self.in_reply_to.as_deref().and_then(|s| s.parse().ok()),
            to: self.to(),
            cc: self.cc(),
            published: timestamp_to_rfc3339(self.published),
            updated: self.updated.map(timestamp_to_rfc3339),
            name: self.name,
            any_of,
            end_time: self.end_time.map(timestamp_to_rfc3339),
        })
    }

    async fn verify(json: &Self::Kind, expected_domain: &Url, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        verify_domains_match(json.id.inner(), expected_domain).map_err(Error::from)
    }

    async fn from_json(json: Self::Kind, data: &Data<Self::DataType>) -> Result<Self, Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let id = json.id.inner().as_str();
        let host = crate::ids::domain_of(id).unwrap_or_default().to_string();
        let any_of: Option<Vec<PollOption>> = json.any_of.map(|opts| {
            opts.into_iter()
                .map(|o| PollOption {
                    name: o.name,
                    replies: o.replies.total_items,
                })
                .collect()
        });

        if let Some(existing) = crate::models::note::find_by_id(&mut tx, id).await? {
            tx.commit().await?;
            return Ok(existing);
        }

        let note = crate::models::note::insert(
            &mut tx,
            id,
            json.attributed_to.inner().as_str(),
            &host,
            &json.content,
            json.in_reply_to.as_ref().map(Url::as_str),
            &json.to,
            &json.cc,
            rfc3339_to_timestamp(&json.published),
            json.name.as_deref(),
            any_of.as_deref(),
            json.end_time.as_deref().map(rfc3339_to_timestamp),
        )
        .await?;

        let tags = crate::models::hashtag::extract(&note.content);
        crate::models::hashtag::replace_for_note(&mut tx, &note.id, &tags).await?;

        tx.commit().await?;
        Ok(note)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub actor: ObjectId<Actor>,
    pub object: ObjectId<Actor>,
    #[serde(rename = "type")]
    pub kind: FollowType,
    pub id: Url,
}

impl Follow {
    pub fn new(actor: ObjectId<Actor>, object: ObjectId<Actor>, id: Url) -> Self {
        Follow {
            actor,
            object,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Follow {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let follower = self.actor.dereference(data).await?;
        let followed = self.object.dereference(data).await?;
        if !followed.is_local {
            return Err(Error::Validation("follow target is not local".into()));
        }

        let mut tx = data.app_data().store.begin().await?;
        let auto_accept = !followed.manually_approves_followers;
        let already = crate::models::follow::find(&mut tx, &follower.id, &followed.id).await?;
        if already.is_none() {
            crate::models::follow::insert(
                &mut tx,
                &follower.id,
                &followed.id,
                self.id.as_str(),
                auto_accept.then_some(true),
            )
            .await?;
        }
        tx.commit().await?;

        if auto_accept {
            let accept = Accept::new(
                ObjectId::parse(&followed.id)?,
                self.clone(),
                crate::ids::mint(&data.domain().to_string(), crate::ids::Kind::Activity).parse()?,
            );
            enqueue_local(data, &followed, &accept).await?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accept {
    pub actor: ObjectId<Actor>,
    pub object: Follow,
    #[serde(rename = "type")]
    pub kind: AcceptType,
    pub id: Url,
}

impl Accept {
    pub fn new(actor: ObjectId<Actor>, object: Follow, id: Url) -> Self {
        Accept {
            actor,
            object,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Accept {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        crate::models::follow::set_accepted(
            &mut tx,
            self.object.actor.inner().as_str(),
            self.object.object.inner().as_str(),
            true,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reject {
    pub actor: ObjectId<Actor>,
    pub object: Follow,
    #[serde(rename = "type")]
    pub kind: RejectType,
    pub id: Url,
}

impl Reject {
    pub fn new(actor: ObjectId<Actor>, object: Follow, id: Url) -> Self {
        Reject {
            actor,
            object,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Reject {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        crate::models::follow::delete(
            &mut tx,
            self.object.actor.inner().as_str(),
            self.object.object.inner().as_str(),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// What an `Undo` can wrap. Only `Follow` and `Announce` ever get undone in
/// this system, so this is a small closed set rather than a boxed `dyn`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Undoable {
    Follow(Follow),
    Announce(Announce),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Undo {
    pub actor: ObjectId<Actor>,
    pub object: Undoable,
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
}

#[async_trait::async_trait]
impl ActivityHandler for Undo {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        match self.object {
            Undoable::Follow(follow) => {
                crate::models::follow::delete(
                    &mut tx,
                    follow.actor.inner().as_str(),
                    follow.object.inner().as_str(),
                )
                .await?;
            }
            Undoable::Announce(announce) => {
                crate::models::share::delete(
                    &mut tx,
                    announce.object.inner().as_str(),
                    announce.actor.inner().as_str(),
                )
                .await?;
                crate::models::feed::delete_for_share(
                    &mut tx,
                    announce.object.inner().as_str(),
                    announce.actor.inner().as_str(),
                )
                .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announce {
    pub actor: ObjectId<Actor>,
    pub object: ObjectId<Note>,
    #[serde(rename = "type")]
    pub kind: AnnounceType,
    pub id: Url,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
}

impl Announce {
    pub fn new(actor: ObjectId<Actor>, object: ObjectId<Note>, id: Url, to: Vec<String>, cc: Vec<String>) -> Self {
        Announce {
            actor,
            object,
            kind: Default::default(),
            id,
            to,
            cc,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Announce {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let sharer = self.actor.dereference(data).await?;
        let note = self.object.dereference(data).await?;

        let mut tx = data.app_data().store.begin().await?;
        if crate::models::share::find(&mut tx, &note.id, &sharer.id).await?.is_none() {
            crate::models::share::insert(&mut tx, &note.id, &sharer.id).await?;
        }
        let followers = crate::models::follow::list_followers(&mut tx, &sharer.id).await?;
        for follower in &followers {
            if let Some(owner) = crate::models::actor::find_by_id(&mut tx, &follower.follower).await? {
                if owner.is_local {
                    crate::models::feed::insert(&mut tx, &owner.id, &note.id, &sharer.id).await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Create {
    pub actor: ObjectId<Actor>,
    pub object: NoteWire,
    #[serde(rename = "type")]
    pub kind: CreateType,
    pub id: Url,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
}

impl Create {
    pub fn new(actor: ObjectId<Actor>, object: NoteWire, id: Url) -> Self {
        let to = object.to.clone();
        let cc = object.cc.clone();
        Create {
            actor,
            object,
            kind: Default::default(),
            id,
            to,
            cc,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Create {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        if self.object.attributed_to.inner() != self.actor.inner() {
            return Err(Error::bad_signature());
        }
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let note = Note::from_json(self.object, data).await?;

        if note.is_poll_vote() {
            if let Some(poll_id) = note.in_reply_to.as_deref() {
                crate::jobs::poller::retally_poll(data, poll_id).await?;
            }
            return Ok(());
        }

        // A reply to one of our local posts gets forwarded to our own
        // followers per the limited-depth reply-forwarding rule.
        if let Some(parent_id) = note.in_reply_to.clone() {
            crate::inbox::forward::forward_reply_if_local_root(data, &note, &parent_id, 0).await?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub actor: ObjectId<Actor>,
    pub object: NoteWire,
    #[serde(rename = "type")]
    pub kind: UpdateType,
    pub id: Url,
}

impl Update {
    pub fn new(actor: ObjectId<Actor>, object: NoteWire, id: Url) -> Self {
        Update {
            actor,
            object,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Update {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        if self.object.attributed_to.inner() != self.actor.inner() {
            return Err(Error::bad_signature());
        }
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let updated = self
            .object
            .updated
            .as_deref()
            .map(rfc3339_to_timestamp)
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let note = crate::models::note::update_content(
            &mut tx,
            self.object.id.inner().as_str(),
            &self.object.content,
            updated,
        )
        .await?;
        if let Some(note) = &note {
            let tags = crate::models::hashtag::extract(&note.content);
            crate::models::hashtag::replace_for_note(&mut tx, &note.id, &tags).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// `Update` wrapping a full actor document, for profile edits. Distinct
/// from [`Update`] (which wraps a `Note`) since `ActivityHandler` dispatch
/// needs one concrete shape per activity type.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActor {
    pub actor: ObjectId<Actor>,
    pub object: ActorWire,
    #[serde(rename = "type")]
    pub kind: UpdateType,
    pub id: Url,
}

impl UpdateActor {
    pub fn new(actor: ObjectId<Actor>, object: ActorWire, id: Url) -> Self {
        UpdateActor {
            actor,
            object,
            kind: Default::default(),
            id,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for UpdateActor {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        if self.object.id.inner() != self.actor.inner() {
            return Err(Error::bad_signature());
        }
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Actor::from_json(self.object, data).await?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Tombstone {
    pub id: Url,
    #[serde(rename = "type", default = "default_tombstone_type")]
    pub kind: String,
}

fn default_tombstone_type() -> String {
    "Tombstone".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delete {
    pub actor: ObjectId<Actor>,
    pub object: Tombstone,
    #[serde(rename = "type")]
    pub kind: DeleteType,
    pub id: Url,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
}

impl Delete {
    pub fn new(actor: ObjectId<Actor>, object_id: Url, id: Url, to: Vec<String>, cc: Vec<String>) -> Self {
        Delete {
            actor,
            object: Tombstone {
                id: object_id,
                kind: default_tombstone_type(),
            },
            kind: Default::default(),
            id,
            to,
            cc,
        }
    }
}

#[async_trait::async_trait]
impl ActivityHandler for Delete {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        self.actor.inner()
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        let mut tx = data.app_data().store.begin().await?;
        let object_id = self.object.id.to_string();

        if let Some(note) = crate::models::note::find_by_id(&mut tx, &object_id).await? {
            if note.author != self.actor.inner().as_str() {
                tracing::warn!(actor = %self.actor.inner(), note = %object_id, "delete actor does not own note, ignoring");
                tx.commit().await?;
                return Ok(());
            }
            crate::models::note::mark_deleted(&mut tx, &object_id).await?;
            crate::models::outbox_item::mark_sent_for_note_creates(&mut tx, &object_id).await?;
        } else if let Some(moved) = crate::models::actor::find_by_id(&mut tx, self.actor.inner().as_str()).await? {
            // Tombstoning the actor itself: treated as account deletion.
            crate::models::actor::delete(&mut tx, &moved.id).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Any activity this server received but doesn't understand. Logged and
/// dropped rather than rejected, the way the teacher's own catch-all does,
/// so an unfamiliar extension activity never fails the whole inbox batch.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UnknownActivity {
    pub id: Url,
    pub actor: Url,
    #[serde(rename = "type")]
    pub kind: String,
}

#[async_trait::async_trait]
impl ActivityHandler for UnknownActivity {
    type DataType = Env;
    type Error = Error;

    fn id(&self) -> &Url {
        &self.id
    }

    fn actor(&self) -> &Url {
        &self.actor
    }

    async fn verify(&self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn receive(self, _data: &Data<Self::DataType>) -> Result<(), Self::Error> {
        tracing::debug!(kind = %self.kind, id = %self.id, "ignoring unhandled activity type");
        Ok(())
    }
}

/// The dispatch enum every inbox POST deserializes into. Order matters for
/// untagged deserialization: `UnknownActivity` must come last so it only
/// matches once every known shape has failed.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
#[enum_delegate::implement(ActivityHandler)]
pub enum AcceptedActivities {
    Follow(Follow),
    Accept(Accept),
    Reject(Reject),
    Undo(Undo),
    Announce(Announce),
    Create(Create),
    Update(Update),
    UpdateActor(UpdateActor),
    Delete(Delete),
    Move(move_activity::Move),
    Unknown(UnknownActivity),
}

/// Enqueues a locally authored activity addressed from `sender` for later
/// delivery; the outbox worker figures out recipients and signs the
/// request at send time, see [`crate::outbox::delivery`].
pub async fn enqueue_local<A>(data: &Data<Env>, sender: &Actor, activity: &A) -> Result<(), Error>
where
    A: Serialize + ActivityHandler,
{
    let mut tx = data.app_data().store.begin().await?;
    let body = serde_json::to_value(activity)?;
    crate::models::outbox_item::enqueue(&mut tx, activity.id().as_str(), &sender.id, &body).await?;
    tx.commit().await?;
    Ok(())
}
