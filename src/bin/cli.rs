use std::path::PathBuf;
use std::process::exit;

use activitypub_federation::config::FederationConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tootik::blocklist::Blocklist;
use tootik::config::Config;
use tootik::db;
use tootik::env::Env;
use tootik::models::actor::{self, ActorKind};
use tootik::resolver::Resolver;
use tootik::store::Store;

#[derive(Parser)]
#[command(name = "tootik-ctl", version, about = "Administrative commands for a tootik instance")]
struct Cli {
    #[arg(short, long, default_value = "tootik.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a local Group actor representing a community account.
    AddCommunity { name: String },
    /// Replaces a local actor's bio with the contents of a text file.
    SetBio { name: String, path: PathBuf },
    /// Sets a local actor's avatar from an image file.
    SetAvatar { name: String, path: PathBuf },
    /// Prints the effective configuration as TOML.
    Dumpcfg,
    /// Prints the binary's version.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("tootik-ctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match Config::from_file_and_env(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            exit(2);
        }
    };

    if let Commands::Dumpcfg = &cli.command {
        println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
        return Ok(());
    }

    let pool = db::connect_database(&config).await?;
    let store = Store::new(pool);
    let blocklist = Blocklist::load(config.blocklist_path.clone()).await?;
    let resolver = Resolver::new();
    let env = Env::new(store, resolver, blocklist, config.clone());

    let federation_config = FederationConfig::builder()
        .domain(config.domain.clone())
        .app_data(env.clone())
        .build()
        .await
        .context("building federation config")?;
    let data = federation_config.to_request_data();

    match cli.command {
        Commands::AddCommunity { name } => {
            let mut tx = env.store.begin().await?;
            let community = actor::create_local(
                &mut tx,
                &config,
                &name,
                &name,
                ActorKind::Group,
                false,
                None,
                None,
            )
            .await?;
            tx.commit().await?;
            println!("created community {}", community.id);
        }
        Commands::SetBio { name, path } => {
            let summary = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut tx = env.store.begin().await?;
            let target = actor::find_local_by_username(&mut tx, &name)
                .await?
                .with_context(|| format!("no local actor named {name}"))?;
            tx.commit().await?;

            tootik::activities::actor::update_profile(&env, &data, &target.id, &target.name, summary.trim())
                .await?;
            println!("updated bio for {}", target.id);
        }
        Commands::SetAvatar { name, path } => {
            let mut tx = env.store.begin().await?;
            let target = actor::find_local_by_username(&mut tx, &name)
                .await?
                .with_context(|| format!("no local actor named {name}"))?;
            tx.commit().await?;

            let icon_url = publish_media(&config, &path)?;
            tootik::activities::actor::update_icon(&env, &data, &target.id, &icon_url).await?;
            println!("updated avatar for {}: {icon_url}", target.id);
        }
        Commands::Dumpcfg | Commands::Version => unreachable!("handled above"),
    }

    Ok(())
}

/// Copies an avatar image into the instance's media directory (a sibling of
/// the database file) and returns the URL a reverse proxy is expected to
/// serve it at. Resizing/transcoding is left to that external collaborator;
/// this just picks a stable, collision-free name.
fn publish_media(config: &Config, source: &PathBuf) -> Result<String> {
    let media_dir = config
        .db_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join("media");
    std::fs::create_dir_all(&media_dir)
        .with_context(|| format!("creating {}", media_dir.display()))?;

    let extension = source.extension().and_then(|e| e.to_str()).unwrap_or("bin");
    let filename = format!("{}.{extension}", uuid::Uuid::new_v4());
    let dest = media_dir.join(&filename);
    std::fs::copy(source, &dest).with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;

    Ok(format!("https://{}/media/{filename}", config.domain))
}
