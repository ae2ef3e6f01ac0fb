use std::net::SocketAddr;
use std::sync::Arc;

use activitypub_federation::config::{FederationConfig, UrlVerifier};
use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use tootik::blocklist::Blocklist;
use tootik::config::Config;
use tootik::env::Env;
use tootik::error::Error;
use tootik::resolver::Resolver;
use tootik::store::Store;
use tootik::web::App;
use tootik::{db, inbox, jobs, outbox};

#[derive(Parser)]
#[command(name = "tootikd", about = "Federated ActivityPub server")]
struct Args {
    #[arg(long, default_value = "tootik.toml")]
    config: String,
}

#[derive(Clone)]
struct BlocklistUrlVerifier {
    blocklist: Arc<Blocklist>,
}

#[async_trait]
impl UrlVerifier for BlocklistUrlVerifier {
    async fn verify(&self, url: &Url) -> Result<(), &'static str> {
        match url.host_str() {
            Some(host) if self.blocklist.is_blocked(host) => Err("host is blocked"),
            Some(_) => Ok(()),
            None => Err("url has no host"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_file_and_env(&args.config)?;

    let pool = db::connect_database(&config).await?;
    let store = Store::new(pool);
    let blocklist = Blocklist::load(config.blocklist_path.clone()).await?;
    let blocklist = Arc::new(blocklist);
    let resolver = Resolver::new();
    let env = Env::new(store, resolver, (*blocklist).clone_inner(), config.clone());

    let federation_config = FederationConfig::builder()
        .domain(config.domain.clone())
        .app_data(env.clone())
        .url_verifier(Box::new(BlocklistUrlVerifier {
            blocklist: blocklist.clone(),
        }))
        .build()
        .await
        .map_err(|e| Error::Fatal(format!("federation config: {e}")))?;

    let shutdown = CancellationToken::new();
    let data = federation_config.to_request_data();

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(inbox::run(data.clone(), shutdown.clone())));
    tasks.push(tokio::spawn(outbox::run(data.clone(), shutdown.clone())));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "poller",
        std::time::Duration::from_secs(30 * 60),
        data.clone(),
        shutdown.clone(),
        jobs::poller::tick,
    )));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "feed_updater",
        config.feed_update_interval,
        data.clone(),
        shutdown.clone(),
        jobs::feed_updater::tick,
    )));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "deleter",
        std::time::Duration::from_secs(12 * 3600),
        data.clone(),
        shutdown.clone(),
        jobs::deleter::tick,
    )));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "mover",
        std::time::Duration::from_secs(6 * 3600),
        data.clone(),
        shutdown.clone(),
        jobs::mover::tick,
    )));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "syncer",
        std::time::Duration::from_secs(6 * 3600),
        data.clone(),
        shutdown.clone(),
        jobs::syncer::tick,
    )));
    tasks.push(tokio::spawn(jobs::run_periodic(
        "gc",
        std::time::Duration::from_secs(12 * 3600),
        data.clone(),
        shutdown.clone(),
        jobs::gc::tick,
    )));

    let addr: SocketAddr = config.listen_addr.parse()?;
    let app = App::new(federation_config);
    app.serve(addr, shutdown.clone()).await?;

    shutdown.cancel();
    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
