//! The repo cache over a manifest file, without a server in between

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

use shellbridge::cache::{RepoInfoCache, SystemClock};
use shellbridge::models::{RepoStatus, SyncState};
use shellbridge::provider::ManifestProvider;

use super::helpers::manifest;

fn cache_over(dir: &TempDir, body: &str, window: Duration) -> Arc<RepoInfoCache> {
    let path = dir.path().join("repos.toml");
    fs::write(&path, body).expect("Failed to write manifest");
    Arc::new(RepoInfoCache::with_clock(
        Box::new(ManifestProvider::new(path)),
        Box::new(SystemClock),
        window,
    ))
}

#[test]
fn test_snapshot_reflects_manifest() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let body = manifest(&[
        ("r1", "Docs", dir.path(), "syncing"),
        ("r2", "Pics", dir.path(), "idle"),
    ]);
    let cache = cache_over(&dir, &body, Duration::from_secs(60));

    let snapshot = cache.snapshot();
    assert!(!snapshot.is_empty());
    assert_eq!(snapshot.repos.len(), 2);
    assert_eq!(snapshot.repos[0].sync_state, SyncState::Syncing);
    assert_eq!(snapshot.repos[0].status(), RepoStatus::Syncing);
    assert_eq!(snapshot.repos[1].status(), RepoStatus::Normal);
}

#[test]
fn test_snapshot_is_reused_inside_window() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let body = manifest(&[("r1", "Docs", dir.path(), "idle")]);
    let cache = cache_over(&dir, &body, Duration::from_secs(60));

    let first = cache.get(0);
    fs::write(dir.path().join("repos.toml"), "").expect("Failed to write manifest");
    let second = cache.get(0);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.repos.len(), 1);
}

#[test]
fn test_client_with_current_snapshot_forces_refresh() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let body = manifest(&[("r1", "Docs", dir.path(), "idle")]);
    let cache = cache_over(&dir, &body, Duration::from_secs(60));

    let first = cache.get(0);
    fs::write(dir.path().join("repos.toml"), "").expect("Failed to write manifest");
    let second = cache.get(first.fetched_at);

    assert!(second.repos.is_empty());
    assert!(second.fetched_at >= first.fetched_at);
}

#[test]
fn test_broken_manifest_keeps_previous_snapshot() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let body = manifest(&[("r1", "Docs", dir.path(), "idle")]);
    let cache = cache_over(&dir, &body, Duration::ZERO);

    let first = cache.get(0);
    fs::write(dir.path().join("repos.toml"), "[[repo]\nnot toml").expect("Failed to write");
    let second = cache.get(0);

    assert_eq!(second.repos.len(), 1);
    assert_eq!(second.fetched_at, first.fetched_at);
}

#[test]
fn test_concurrent_readers_share_one_snapshot() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let body = manifest(&[("r1", "Docs", dir.path(), "idle")]);
    let cache = cache_over(&dir, &body, Duration::from_secs(60));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(0))
        })
        .collect();
    let snapshots: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("reader panicked"))
        .collect();

    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
}
