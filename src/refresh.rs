//! Periodic shell icon refresh.
//!
//! File managers cache the overlay icon of a repo's worktree folder. Each
//! tick compares the cached repo states with the previous tick and tells the
//! shell to re-query folders whose state changed. Folders are also refreshed
//! unconditionally once their last notification is older than the force
//! interval.

use crate::cache::RepoInfoCache;
use crate::models::{Repo, SyncState};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Granularity at which the refresh thread notices shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Tells the desktop shell that a folder's overlay should be re-queried.
pub trait ShellNotifier: Send {
    fn notify_changed(&self, worktree: &Path);
}

/// Notifier used when no desktop integration is available.
pub struct LoggingNotifier;

impl ShellNotifier for LoggingNotifier {
    fn notify_changed(&self, worktree: &Path) {
        debug!("Shell attributes changed: {}", worktree.display());
    }
}

pub struct IconRefresher {
    notifier: Box<dyn ShellNotifier>,
    force_refresh_ms: u64,
    last_states: HashMap<String, SyncState>,
    last_notified: HashMap<String, u64>,
}

impl IconRefresher {
    pub fn new(notifier: Box<dyn ShellNotifier>, force_refresh: Duration) -> Self {
        Self {
            notifier,
            force_refresh_ms: u64::try_from(force_refresh.as_millis()).unwrap_or(u64::MAX),
            last_states: HashMap::new(),
            last_notified: HashMap::new(),
        }
    }

    /// Process one set of repos observed at `now` (ms since epoch).
    ///
    /// # Returns
    /// The number of worktrees the shell was notified about.
    pub fn tick(&mut self, repos: &[Repo], now: u64) -> usize {
        let mut notified = 0;
        for repo in repos {
            let last_ts = self.last_notified.get(&repo.id).copied().unwrap_or(0);
            let changed = if now.saturating_sub(last_ts) < self.force_refresh_ms {
                self.last_states
                    .get(&repo.id)
                    .is_none_or(|last| *last != repo.sync_state)
            } else {
                true
            };

            if changed {
                self.notifier.notify_changed(&repo.worktree);
                self.last_notified.insert(repo.id.clone(), now);
                notified += 1;
            }
        }

        self.last_states = repos
            .iter()
            .map(|repo| (repo.id.clone(), repo.sync_state))
            .collect();
        // Forget repos that left the snapshot
        self.last_notified.retain(|id, _| self.last_states.contains_key(id));
        notified
    }

    /// Run the refresher on its own thread until `shutdown_flag` is set.
    pub fn spawn(
        mut self,
        cache: Arc<RepoInfoCache>,
        interval: Duration,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("icon-refresh".to_string())
            .spawn(move || {
                while !shutdown_flag.load(Ordering::Relaxed) {
                    let snapshot = cache.snapshot();
                    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
                    self.tick(&snapshot.repos, now);

                    let mut waited = Duration::ZERO;
                    while waited < interval && !shutdown_flag.load(Ordering::Relaxed) {
                        thread::sleep(SHUTDOWN_POLL);
                        waited += SHUTDOWN_POLL;
                    }
                }
            })
            .context("Failed to spawn icon refresh thread")
    }
}
