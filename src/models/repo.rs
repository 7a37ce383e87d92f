use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A locally mirrored repository as reported by the status provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// Stable repository identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Local root directory of the synchronized copy
    pub worktree: PathBuf,
    /// Whether automatic synchronization is enabled
    pub auto_sync: bool,
    /// Last known sync state
    pub sync_state: SyncState,
}

/// Sync state of a repository as reported upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Error,
}

impl std::str::FromStr for SyncState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SyncState::Idle),
            "syncing" => Ok(SyncState::Syncing),
            "error" => Ok(SyncState::Error),
            _ => anyhow::bail!("Invalid sync state: {s}. Use: idle, syncing, error"),
        }
    }
}

/// Status shown to the extension for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoStatus {
    Paused,
    Syncing,
    Error,
    Normal,
}

impl RepoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoStatus::Paused => "paused",
            RepoStatus::Syncing => "syncing",
            RepoStatus::Error => "error",
            RepoStatus::Normal => "normal",
        }
    }
}

impl std::fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RepoStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paused" => Ok(RepoStatus::Paused),
            "syncing" => Ok(RepoStatus::Syncing),
            "error" => Ok(RepoStatus::Error),
            "normal" => Ok(RepoStatus::Normal),
            _ => anyhow::bail!("Unknown repo status: {s}"),
        }
    }
}

type StatusRule = (fn(&Repo) -> bool, RepoStatus);

/// Display status rules, evaluated in order. The first matching rule wins.
const STATUS_RULES: &[StatusRule] = &[
    (sync_disabled, RepoStatus::Paused),
    (is_syncing, RepoStatus::Syncing),
    (has_error, RepoStatus::Error),
];

fn sync_disabled(repo: &Repo) -> bool {
    !repo.auto_sync
}

fn is_syncing(repo: &Repo) -> bool {
    repo.sync_state == SyncState::Syncing
}

fn has_error(repo: &Repo) -> bool {
    repo.sync_state == SyncState::Error
}

impl Repo {
    /// Derive the status the extension displays for this repo.
    ///
    /// A repo with auto-sync disabled is always `paused`, whatever its
    /// sync state says.
    pub fn status(&self) -> RepoStatus {
        STATUS_RULES
            .iter()
            .find(|(matches, _)| matches(self))
            .map(|(_, status)| *status)
            .unwrap_or(RepoStatus::Normal)
    }
}

/// An immutable view of all tracked repositories at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Repos in provider order
    pub repos: Vec<Repo>,
    /// Fetch time in milliseconds since the Unix epoch, 0 if never fetched
    pub fetched_at: u64,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.fetched_at == 0
    }
}
