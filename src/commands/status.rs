//! Status command - reports whether the server is up

use crate::config::Config;
use crate::daemon::{ExtServer, ServerStatus};
use anyhow::Result;
use colored::Colorize;

pub fn execute(config: &Config) -> Result<()> {
    let socket = config.socket_path.display();
    match ExtServer::check_status(config) {
        ServerStatus::Running => {
            let pid = ExtServer::read_pid(config)
                .map(|pid| format!(" (pid {pid})"))
                .unwrap_or_default();
            println!("{} Server running on {socket}{pid}", "✓".green().bold());
        }
        ServerStatus::ProcessOnly => {
            println!(
                "{} Server process alive but {socket} is not accepting connections",
                "!".yellow().bold()
            );
        }
        ServerStatus::NotRunning => {
            println!("{} Server is not running", "─".dimmed());
        }
    }
    Ok(())
}
