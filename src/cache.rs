//! Time-bounded cache in front of the status provider.
//!
//! Every connection asking for repo status goes through one shared
//! [`RepoInfoCache`]. Reads inside the refresh window are served from the
//! current snapshot; the read-or-refresh decision and the refresh itself run
//! under a single lock, so concurrent callers never trigger duplicate
//! upstream fetches and never observe a partially built snapshot.

use crate::models::{CacheSnapshot, Repo};
use crate::provider::{ProviderError, StatusProvider};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default minimum interval between upstream refreshes.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_millis(2000);

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

pub struct RepoInfoCache {
    provider: Box<dyn StatusProvider>,
    clock: Box<dyn Clock>,
    refresh_window_ms: u64,
    current: Mutex<Arc<CacheSnapshot>>,
}

impl RepoInfoCache {
    pub fn new(provider: Box<dyn StatusProvider>) -> Self {
        Self::with_clock(provider, Box::new(SystemClock), DEFAULT_REFRESH_WINDOW)
    }

    pub fn with_clock(
        provider: Box<dyn StatusProvider>,
        clock: Box<dyn Clock>,
        refresh_window: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            refresh_window_ms: u64::try_from(refresh_window.as_millis()).unwrap_or(u64::MAX),
            current: Mutex::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// Return a snapshot at least as new as `client_ts`.
    ///
    /// The cached snapshot is returned as-is when it exists, is newer than
    /// what the client already has, and is younger than the refresh window.
    /// Otherwise the provider is queried and the snapshot replaced.
    ///
    /// # Arguments
    /// * `client_ts` - The client's last known snapshot time (ms since epoch)
    ///
    /// # Returns
    /// The current snapshot. If a refresh fails the previous snapshot is
    /// returned unchanged (empty if there never was one).
    pub fn get(&self, client_ts: u64) -> Arc<CacheSnapshot> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now_millis();
        let cache_ts = current.fetched_at;
        if cache_ts != 0
            && cache_ts > client_ts
            && now.saturating_sub(cache_ts) < self.refresh_window_ms
        {
            return Arc::clone(&current);
        }

        debug!(client_ts, cache_ts, "Refreshing repo info from provider");
        match self.fetch() {
            Ok(repos) => {
                // Keep snapshot timestamps monotonic even if the wall clock steps back
                let fetched_at = self.clock.now_millis().max(cache_ts).max(1);
                *current = Arc::new(CacheSnapshot { repos, fetched_at });
            }
            Err(e) => {
                warn!("Failed to refresh repo info, serving previous snapshot: {e}");
            }
        }

        Arc::clone(&current)
    }

    /// Return the current snapshot, refreshing only if it is stale.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.get(0)
    }

    fn fetch(&self) -> Result<Vec<Repo>, ProviderError> {
        let mut repos = self.provider.list_repos()?;
        for repo in repos.iter_mut() {
            if let Err(e) = self.provider.fetch_sync_status(repo) {
                warn!(repo = %repo.id, "Failed to fetch sync status: {e}");
            }
        }
        Ok(repos)
    }
}
