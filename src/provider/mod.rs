//! Upstream sources of repository sync status.

mod manifest;

pub use manifest::ManifestProvider;

use crate::models::Repo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("status provider unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid repo manifest: {0}")]
    Manifest(#[from] toml::de::Error),
    #[error("unknown repo: {0}")]
    UnknownRepo(String),
}

/// Supplies the tracked repositories and their live sync status.
///
/// Both calls are synchronous and may be slow; callers go through
/// [`crate::cache::RepoInfoCache`] rather than hitting a provider directly.
pub trait StatusProvider: Send + Sync {
    /// List every locally tracked repository, in a stable order.
    fn list_repos(&self) -> Result<Vec<Repo>, ProviderError>;

    /// Refresh the sync state fields of `repo` in place.
    fn fetch_sync_status(&self, repo: &mut Repo) -> Result<(), ProviderError>;
}
