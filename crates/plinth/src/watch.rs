// ── Config change detection and reload loop ──
//
// `poll_file` compares the file's (mtime, length) on every tick and raises a
// signal on change. `reload_loop` waits for signals and reconciles on the
// blocking pool. `Notify` holds at most one permit, so any number of signals
// raised during a reconcile collapse into a single follow-up pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use plinth_config::ServerSettings;
use plinth_core::Host;

/// What a poll observed: `None` when the file could not be stat'ed.
type Fingerprint = Option<(Option<SystemTime>, u64)>;

async fn fingerprint(path: &Path) -> Fingerprint {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some((meta.modified().ok(), meta.len()))
}

/// Poll `path` every `interval` until cancelled, signalling `changed` on
/// every observed difference.
pub async fn poll_file(
    path: PathBuf,
    interval: Duration,
    changed: Arc<Notify>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // First tick completes immediately; take the baseline there.
    ticker.tick().await;
    let mut last = fingerprint(&path).await;
    debug!(path = %path.display(), ?interval, "watching config file");

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                let current = fingerprint(&path).await;
                if current != last {
                    debug!(path = %path.display(), "config file changed");
                    last = current;
                    changed.notify_one();
                }
            }
        }
    }
    debug!("config watcher stopped");
}

/// Reloads the config file into a [`Host`].
#[derive(Debug, Clone)]
pub struct Reloader {
    host: Host,
    path: PathBuf,
    /// Server settings in effect; these are read once at startup.
    server: ServerSettings,
}

impl Reloader {
    pub fn new(host: Host, path: PathBuf, server: ServerSettings) -> Self {
        Self { host, path, server }
    }

    /// Load and apply the file once. Every failure is logged and leaves the
    /// current routes serving. Blocking.
    pub fn reload(&self) {
        let config = match plinth_config::load(&self.path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "config reload failed; keeping current units");
                return;
            }
        };

        if config.server != self.server {
            warn!("server settings changed; restart to apply them");
        }

        // A rejected snapshot is logged by the host.
        if let Ok(outcome) = self.host.apply(&config.snapshot()) {
            for err in &outcome.errors {
                warn!(unit = %err.unit(), error = %err, "unit error during reload");
            }
            info!(
                revision = self.host.revision(),
                active = ?outcome.active,
                started = ?outcome.started,
                stopped = ?outcome.stopped,
                "config reloaded"
            );
        }
    }
}

/// Wait for change signals and reload until cancelled.
pub async fn reload_loop(reloader: Reloader, changed: Arc<Notify>, token: CancellationToken) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            () = changed.notified() => {}
        }

        let pass = reloader.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || pass.reload()).await {
            warn!(error = %err, "reload task failed");
        }
    }
    debug!("reload loop stopped");
}
