//! Share-link requests emitted by the extension protocol.
//!
//! The protocol core only produces [`ShareLinkEvent`]s onto a bounded queue.
//! A coordinator thread drains the queue and hands each event to a
//! [`ShareLinkCoordinator`], which owns the actual link creation and
//! whatever the user gets to see afterwards.

use anyhow::{bail, Context, Result};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the coordinator thread re-checks the shutdown flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A request to create a share link for a path inside a tracked repo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkEvent {
    pub repo_id: String,
    /// Path relative to the repo worktree, forward-slash separated
    pub path_in_repo: String,
    pub is_file: bool,
}

/// Performs share-link creation for events coming off the queue.
pub trait ShareLinkCoordinator: Send + Sync {
    /// Create a link for `event`, returning it if one was produced.
    fn generate(&self, event: &ShareLinkEvent) -> Result<Option<String>>;
}

/// Coordinator that only records requests in the log.
pub struct LoggingCoordinator;

impl ShareLinkCoordinator for LoggingCoordinator {
    fn generate(&self, event: &ShareLinkEvent) -> Result<Option<String>> {
        info!(
            repo = %event.repo_id,
            path = %event.path_in_repo,
            is_file = event.is_file,
            "Share link requested"
        );
        Ok(None)
    }
}

/// Coordinator delegating to an external program.
///
/// The program is invoked as `<argv...> <repo_id> <path_in_repo> file|dir`
/// and is expected to print the link on stdout.
pub struct CommandCoordinator {
    program: String,
    args: Vec<String>,
}

impl CommandCoordinator {
    /// Build a coordinator from an argv list; `None` if the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ShareLinkCoordinator for CommandCoordinator {
    fn generate(&self, event: &ShareLinkEvent) -> Result<Option<String>> {
        let kind = if event.is_file { "file" } else { "dir" };
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&event.repo_id)
            .arg(&event.path_in_repo)
            .arg(kind)
            .output()
            .with_context(|| format!("Failed to run share link command: {}", self.program))?;

        if !output.status.success() {
            bail!(
                "Share link command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let link = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!link.is_empty()).then_some(link))
    }
}

/// Spawn the thread that drains share-link events.
///
/// The thread exits once every sender is dropped or `shutdown_flag` is set.
pub fn spawn_coordinator(
    events: Receiver<ShareLinkEvent>,
    coordinator: Arc<dyn ShareLinkCoordinator>,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("share-link".to_string())
        .spawn(move || loop {
            match events.recv_timeout(POLL_INTERVAL) {
                Ok(event) => match coordinator.generate(&event) {
                    Ok(Some(link)) => info!(repo = %event.repo_id, "Share link generated: {link}"),
                    Ok(None) => {}
                    Err(e) => warn!(repo = %event.repo_id, "Failed to generate share link: {e:#}"),
                },
                Err(RecvTimeoutError::Timeout) => {
                    if shutdown_flag.load(Ordering::Relaxed) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Share link queue closed");
                    break;
                }
            }
        })
        .context("Failed to spawn share link thread")
}
