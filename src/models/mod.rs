pub mod repo;

pub use repo::{CacheSnapshot, Repo, RepoStatus, SyncState};
