//! Round trips through a running server using the bundled client

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shellbridge::daemon::{ExtClient, RepoRecord};
use shellbridge::models::RepoStatus;

use super::helpers::*;

#[test]
fn test_list_repos_reports_display_status() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    let pics = worktree(&dir, "Pics");
    let music = worktree(&dir, "Music");
    let body = format!(
        "{}\n[[repo]]\nid = \"r3\"\nname = \"Music\"\nworktree = \"{}\"\nauto_sync = false\nstate = \"syncing\"\n",
        manifest(&[
            ("r1", "Docs", docs.as_path(), "idle"),
            ("r2", "Pics", pics.as_path(), "error"),
        ]),
        music.display()
    );
    let server = TestServer::start(dir, &body);

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    let records = client.list_repos(0).expect("list-repos failed");

    assert_eq!(
        records,
        vec![
            RepoRecord {
                id: "r1".to_string(),
                name: "Docs".to_string(),
                worktree: docs.display().to_string(),
                status: RepoStatus::Normal,
            },
            RepoRecord {
                id: "r2".to_string(),
                name: "Pics".to_string(),
                worktree: pics.display().to_string(),
                status: RepoStatus::Error,
            },
            RepoRecord {
                id: "r3".to_string(),
                name: "Music".to_string(),
                worktree: music.display().to_string(),
                status: RepoStatus::Paused,
            },
        ]
    );

    server.stop().expect("server failed");
}

#[test]
fn test_list_repos_with_no_manifest_is_empty() {
    let server = TestServer::start(temp_dir(), "");
    fs::remove_file(&server.manifest).expect("Failed to remove manifest");

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    assert!(client.list_repos(0).expect("list-repos failed").is_empty());
}

#[test]
fn test_connection_serves_many_requests() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    let server = TestServer::start(dir, &manifest(&[("r1", "Docs", docs.as_path(), "idle")]));

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    for _ in 0..5 {
        assert_eq!(client.list_repos(0).expect("list-repos failed").len(), 1);
    }
}

#[test]
fn test_share_link_reaches_coordinator() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    fs::create_dir_all(docs.join("reports")).expect("Failed to create dir");
    fs::write(docs.join("reports/q3.txt"), "numbers").expect("Failed to write file");
    let server = TestServer::start(dir, &manifest(&[("r1", "Docs", docs.as_path(), "idle")]));

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    client
        .get_share_link(&docs.join("reports/q3.txt").to_string_lossy())
        .expect("get-share-link failed");
    client
        .get_share_link(&docs.join("reports").to_string_lossy())
        .expect("get-share-link failed");

    assert!(wait_until(Duration::from_secs(5), || server.shared_events().len() == 2));
    let events = server.shared_events();
    assert_eq!(events[0].repo_id, "r1");
    assert_eq!(events[0].path_in_repo, "reports/q3.txt");
    assert!(events[0].is_file);
    assert_eq!(events[1].path_in_repo, "reports");
    assert!(!events[1].is_file);
}

#[test]
fn test_share_link_outside_repos_is_ignored() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    let elsewhere = worktree(&dir, "Elsewhere");
    let server = TestServer::start(dir, &manifest(&[("r1", "Docs", docs.as_path(), "idle")]));

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    client
        .get_share_link(&elsewhere.join("notes.txt").to_string_lossy())
        .expect("get-share-link failed");
    client
        .get_share_link(&docs.to_string_lossy())
        .expect("get-share-link failed");
    client
        .get_share_link(&docs.join("a.txt").to_string_lossy())
        .expect("get-share-link failed");

    assert!(wait_until(Duration::from_secs(5), || !server.shared_events().is_empty()));
    // Let the coordinator surface anything unexpected
    thread::sleep(Duration::from_millis(200));
    let events = server.shared_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path_in_repo, "a.txt");
    assert!(!events[0].is_file);
}

#[test]
fn test_concurrent_clients_see_same_repos() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    let pics = worktree(&dir, "Pics");
    let body = manifest(&[
        ("r1", "Docs", docs.as_path(), "idle"),
        ("r2", "Pics", pics.as_path(), "syncing"),
    ]);
    let server = Arc::new(TestServer::start(dir, &body));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let mut client =
                    ExtClient::connect(server.socket_path()).expect("Failed to connect");
                client.list_repos(0).expect("list-repos failed")
            })
        })
        .collect();

    for handle in handles {
        let records = handle.join().expect("client thread panicked");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, RepoStatus::Syncing);
    }
}

#[test]
fn test_manifest_changes_visible_after_refresh_window() {
    let dir = temp_dir();
    let docs = worktree(&dir, "Docs");
    let server = TestServer::start_with(
        dir,
        &manifest(&[("r1", "Docs", docs.as_path(), "idle")]),
        |config| config.refresh_window_ms = 50,
    );

    let mut client = ExtClient::connect(server.socket_path()).expect("Failed to connect");
    let first = client.list_repos(0).expect("list-repos failed");
    assert_eq!(first[0].status, RepoStatus::Normal);

    server.write_manifest(&manifest(&[("r1", "Docs", docs.as_path(), "syncing")]));
    assert!(wait_until(Duration::from_secs(5), || {
        client
            .list_repos(0)
            .map(|records| records[0].status == RepoStatus::Syncing)
            .unwrap_or(false)
    }));
}
