pub mod actor;
pub mod delivery_attempt;
pub mod feed;
pub mod follow;
pub mod hashtag;
pub mod inbox_item;
pub mod invite;
pub mod note;
pub mod outbox_item;
pub mod share;
