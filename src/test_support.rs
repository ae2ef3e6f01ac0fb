//! In-memory store + `Env` builder shared by unit tests across the crate.
//! Not compiled outside `#[cfg(test)]`.

use sqlx::SqlitePool;

use crate::blocklist::Blocklist;
use crate::config::Config;
use crate::env::Env;
use crate::resolver::Resolver;
use crate::store::Store;

pub fn test_config(domain: &str) -> Config {
    Config {
        domain: domain.to_string(),
        db_path: "memory".into(),
        listen_addr: "127.0.0.1:0".to_string(),
        max_delivery_attempts: 10,
        max_delivery_queue_size: 128,
        max_forwarding_depth: 3,
        edit_throttle_unit: std::time::Duration::from_secs(60),
        edit_throttle_factor: 4.0,
        max_posts_length: 5000,
        max_invites_per_user: 5,
        require_invitation: false,
        resolver_max_idle_conns: 16,
        resolver_idle_conn_timeout: std::time::Duration::from_secs(30),
        feed_update_interval: std::time::Duration::from_secs(60),
        gemini_request_timeout: std::time::Duration::from_secs(30),
        guppy_request_timeout: std::time::Duration::from_secs(30),
        use_ed25519_keys: false,
        blocklist_path: None,
    }
}

pub async fn test_env(domain: &str) -> Env {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    Env::new(
        Store::new(pool),
        Resolver::new(),
        Blocklist::empty(),
        test_config(domain),
    )
}
