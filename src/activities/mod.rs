//! Activity Builder: turns a local user action (follow someone, post a
//! note, edit it, delete it, boost something) into a signed ActivityStreams
//! activity queued in the outbox. Every function here opens its own
//! transaction and leaves delivery itself to [`crate::outbox`].

pub mod actor;
pub mod announce;
pub mod follow;
pub mod note;

use url::Url;

use crate::error::Error;

pub(crate) fn public_to_cc(followers: &str) -> (Vec<String>, Vec<String>) {
    (
        vec!["https://www.w3.org/ns/activitystreams#Public".to_string()],
        vec![followers.to_string()],
    )
}

pub(crate) fn parse_url(s: &str) -> Result<Url, Error> {
    s.parse().map_err(Error::from)
}
