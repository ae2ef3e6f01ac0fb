pub mod activities;
pub mod activitypub;
pub mod blocklist;
pub mod config;
pub mod db;
pub mod env;
pub mod error;
pub mod ids;
pub mod inbox;
pub mod jobs;
pub mod models;
pub mod outbox;
pub mod resolver;
pub mod store;
pub mod web;

#[cfg(test)]
pub mod test_support;

pub use crate::config::Config;
pub use crate::env::Env;
pub use crate::error::Error;
