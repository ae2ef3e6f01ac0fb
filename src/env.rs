use std::sync::Arc;

use crate::blocklist::Blocklist;
use crate::config::Config;
use crate::resolver::Resolver;
use crate::store::Store;

/// The one dependency-injection record the process builds at startup.
/// Every subsystem receives an `Env` (or a clone of it, since everything
/// inside is cheaply shareable) instead of reaching for ambient statics.
#[derive(Clone)]
pub struct Env {
    pub store: Store,
    pub resolver: Resolver,
    pub blocklist: Arc<Blocklist>,
    pub config: Arc<Config>,
}

impl Env {
    pub fn new(store: Store, resolver: Resolver, blocklist: Blocklist, config: Config) -> Self {
        Env {
            store,
            resolver,
            blocklist: Arc::new(blocklist),
            config: Arc::new(config),
        }
    }
}
