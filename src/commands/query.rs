//! Client commands that talk to a running server over its socket

use crate::config::Config;
use crate::daemon::ExtClient;
use anyhow::{Context, Result};
use colored::Colorize;

/// Print the repos the server reports.
pub fn list_repos(config: &Config, since: u64, json: bool) -> Result<()> {
    let mut client = ExtClient::connect(&config.socket_path)?;
    let records = client.list_repos(since)?;

    if json {
        let out = serde_json::to_string_pretty(&records).context("Failed to serialize repos")?;
        println!("{out}");
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No repos tracked", "─".dimmed());
        return Ok(());
    }

    for record in &records {
        let status = match record.status.as_str() {
            "normal" => record.status.as_str().green(),
            "syncing" => record.status.as_str().cyan(),
            "error" => record.status.as_str().red(),
            other => other.dimmed(),
        };
        println!(
            "{:<10} {} {} {}",
            status,
            record.name.bold(),
            record.worktree.dimmed(),
            format!("({})", record.id).dimmed()
        );
    }
    Ok(())
}

/// Request a share link for `path`.
pub fn share_link(config: &Config, path: &str) -> Result<()> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path: {path}"))?;
    let mut client = ExtClient::connect(&config.socket_path)?;
    client.get_share_link(&path.to_string_lossy())?;
    println!("{} Share link requested for {}", "✓".green().bold(), path.display());
    Ok(())
}
