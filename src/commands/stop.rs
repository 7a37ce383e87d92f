//! Stop command - gracefully shuts down the server

use crate::config::Config;
use crate::daemon::ExtServer;
use anyhow::{Context, Result};
use colored::Colorize;

/// Execute the stop command to gracefully shut down the server
pub fn execute(config: &Config) -> Result<()> {
    if !ExtServer::is_running(config) {
        println!("{} Server is not running", "─".dimmed());
        return Ok(());
    }

    println!("{} Stopping server...", "→".cyan().bold());
    ExtServer::stop(config).context("Failed to stop server")?;

    println!("{} Server stopped", "✓".green().bold());
    Ok(())
}
