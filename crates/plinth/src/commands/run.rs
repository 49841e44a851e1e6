//! `plinth run`: start the requested units, serve them, and follow the config file.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::server;
use crate::watch::{self, Reloader};

use super::util;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (path, config) = util::load_config(global)?;
    let host = plinth_core::Host::new(util::registry()?);

    // Claim the port before any unit starts, so a failed bind leaves
    // nothing running.
    let addr = args.listen.unwrap_or(config.server.listen);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind { addr, source })?;
    let local = listener.local_addr()?;
    let dev = config.dev_mode();

    // An unusable unit list at startup is fatal; later reloads only log.
    let outcome = util::apply(&host, config.snapshot()).await?;
    for err in &outcome.errors {
        warn!(unit = %err.unit(), error = %err, "unit failed during startup");
    }
    info!(active = ?outcome.active, "units started");
    info!(addr = %local, dev, "serving");

    let token = CancellationToken::new();
    let mut background = Vec::new();

    if !args.no_watch {
        let changed = Arc::new(Notify::new());
        background.push(tokio::spawn(watch::poll_file(
            path.clone(),
            config.server.watch_interval(),
            Arc::clone(&changed),
            token.clone(),
        )));
        let reloader = Reloader::new(host.clone(), path, config.server.clone());
        background.push(tokio::spawn(watch::reload_loop(
            reloader,
            changed,
            token.clone(),
        )));
    }

    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                signal_token.cancel();
            }
            Err(err) => warn!(error = %err, "could not listen for Ctrl-C"),
        }
    });

    let served = axum::serve(listener, server::router(host.clone(), dev))
        .with_graceful_shutdown(token.clone().cancelled_owned())
        .await;

    token.cancel();
    for task in background {
        if let Err(err) = task.await {
            warn!(error = %err, "background task failed");
        }
    }
    util::shutdown(&host).await?;
    info!("all units stopped");

    served.map_err(CliError::Io)
}
