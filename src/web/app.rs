use std::net::SocketAddr;

use activitypub_federation::config::{FederationConfig, FederationMiddleware};
use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::env::Env;
use crate::web::handlers::{actor, collections, inbox, note, webfinger};

/// Builds the federation HTTP surface: actor documents, notes, webfinger
/// discovery and the shared/per-actor inboxes. Local account management
/// (invites, bios, avatars) lives in the `tootik-ctl` binary instead of a
/// web form, so there is no session/auth layer here.
pub struct App {
    config: FederationConfig<Env>,
}

impl App {
    pub fn new(config: FederationConfig<Env>) -> Self {
        App { config }
    }

    pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        let app = Router::new()
            .route("/user/:id_or_name", get(actor::get_actor))
            .route("/followers/:name", get(collections::followers))
            .route("/outbox/:name", get(collections::outbox))
            .route("/note/:id", get(note::get_note))
            .route("/.well-known/webfinger", get(webfinger::webfinger))
            .route("/inbox", post(inbox::shared_inbox))
            .route("/user/:id_or_name/inbox", post(inbox::actor_inbox))
            .layer(FederationMiddleware::new(self.config));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        Ok(())
    }
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => token.cancel(),
        _ = terminate => token.cancel(),
        _ = token.cancelled() => {},
    }
}
