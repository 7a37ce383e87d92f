//! File-backed status provider.
//!
//! The sync daemon publishes its repositories to a TOML manifest:
//!
//! ```toml
//! [[repo]]
//! id = "6f1c..."
//! name = "Documents"
//! worktree = "/home/u/Documents"
//! auto_sync = true
//! state = "syncing"
//! ```
//!
//! The file is re-read on every call so updates are picked up without
//! restarting the server.

use super::{ProviderError, StatusProvider};
use crate::models::{Repo, SyncState};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    repo: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    name: String,
    worktree: PathBuf,
    #[serde(default = "default_auto_sync")]
    auto_sync: bool,
    #[serde(default)]
    state: SyncState,
}

fn default_auto_sync() -> bool {
    true
}

impl From<ManifestEntry> for Repo {
    fn from(entry: ManifestEntry) -> Self {
        Repo {
            id: entry.id,
            name: entry.name,
            worktree: entry.worktree,
            auto_sync: entry.auto_sync,
            sync_state: entry.state,
        }
    }
}

pub struct ManifestProvider {
    path: PathBuf,
}

impl ManifestProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Manifest, ProviderError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            // No manifest yet means nothing is tracked
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StatusProvider for ManifestProvider {
    fn list_repos(&self) -> Result<Vec<Repo>, ProviderError> {
        Ok(self.load()?.repo.into_iter().map(Repo::from).collect())
    }

    fn fetch_sync_status(&self, repo: &mut Repo) -> Result<(), ProviderError> {
        let entry = self
            .load()?
            .repo
            .into_iter()
            .find(|entry| entry.id == repo.id)
            .ok_or_else(|| ProviderError::UnknownRepo(repo.id.clone()))?;

        repo.auto_sync = entry.auto_sync;
        repo.sync_state = entry.state;
        Ok(())
    }
}
