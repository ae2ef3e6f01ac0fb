use std::collections::HashMap;

use activitypub_federation::config::Data;
use sha2::{Digest, Sha256};

use crate::env::Env;
use crate::error::Error;
use crate::ids;
use crate::models::{actor, follow};

/// Computes, per local actor and per remote host among its followers, the
/// Mastodon-style `Collection-Synchronization` digest: the bytewise XOR of
/// each follower id's SHA-256, order-independent so either side can
/// recompute it and compare without transmitting the whole collection.
///
/// Logged at debug level for now; a remote that keeps disagreeing with the
/// digest is a signal for an operator to look at, not something this job
/// acts on itself.
pub async fn tick(data: Data<Env>) -> Result<(), Error> {
    let env = data.app_data();
    let mut tx = env.store.begin().await?;
    let locals = actor::list_all_local(&mut tx).await?;
    tx.commit().await?;

    for owner in locals {
        let mut tx = env.store.begin().await?;
        let followers = follow::list_followers(&mut tx, &owner.id).await?;
        tx.commit().await?;

        let mut by_host: HashMap<String, Vec<String>> = HashMap::new();
        for f in followers {
            if let Some(host) = ids::domain_of(&f.follower) {
                by_host.entry(host.to_string()).or_default().push(f.follower);
            }
        }

        for (host, follower_ids) in by_host {
            let digest = xor_digest(&follower_ids);
            tracing::debug!(
                actor = %owner.id,
                host = %host,
                followers = follower_ids.len(),
                digest = %hex::encode(digest),
                "computed collection-synchronization digest"
            );
        }
    }
    Ok(())
}

fn xor_digest(ids: &[String]) -> [u8; 32] {
    let mut acc = [0u8; 32];
    for id in ids {
        let hash = Sha256::digest(id.as_bytes());
        for (a, b) in acc.iter_mut().zip(hash.iter()) {
            *a ^= b;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::xor_digest;

    #[test]
    fn digest_is_order_independent() {
        let a = vec!["https://a.example/user/1".to_string(), "https://b.example/user/2".to_string()];
        let b = vec!["https://b.example/user/2".to_string(), "https://a.example/user/1".to_string()];
        assert_eq!(xor_digest(&a), xor_digest(&b));
    }

    #[test]
    fn digest_changes_with_membership() {
        let a = vec!["https://a.example/user/1".to_string()];
        let b = vec!["https://a.example/user/1".to_string(), "https://b.example/user/2".to_string()];
        assert_ne!(xor_digest(&a), xor_digest(&b));
    }
}
