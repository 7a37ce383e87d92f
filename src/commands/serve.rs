//! Serve command - runs the extension server

use crate::config::Config;
use crate::daemon::ExtServer;
use crate::provider::ManifestProvider;
use anyhow::{bail, Context, Result};
use std::sync::atomic::Ordering;
use tracing::info;

/// Run the extension server, detached from the terminal if `detach` is set.
pub fn execute(config: Config, detach: bool) -> Result<()> {
    if ExtServer::is_running(&config) {
        bail!("Server already running at {}", config.socket_path.display());
    }

    let provider = ManifestProvider::new(&config.repos_manifest);
    info!("Reading repo state from {}", provider.path().display());
    let server = ExtServer::new(config, Box::new(provider));

    // The signal handler thread must be started after forking
    if detach {
        server.daemonize()?;
    }

    let shutdown_flag = server.shutdown_handle();
    ctrlc::set_handler(move || shutdown_flag.store(true, Ordering::Relaxed))
        .context("Failed to install signal handler")?;

    server.run_foreground()
}
