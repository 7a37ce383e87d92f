//! Shared helpers for extension server integration tests

use anyhow::Result;
use std::fs;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use shellbridge::cache::{RepoInfoCache, SystemClock};
use shellbridge::config::Config;
use shellbridge::daemon::{bind_listener, ExtServer};
use shellbridge::provider::ManifestProvider;
use shellbridge::share_link::{ShareLinkCoordinator, ShareLinkEvent};

/// Coordinator that keeps every event it receives.
#[derive(Default)]
pub struct CollectingCoordinator {
    pub events: Mutex<Vec<ShareLinkEvent>>,
}

impl ShareLinkCoordinator for CollectingCoordinator {
    fn generate(&self, event: &ShareLinkEvent) -> Result<Option<String>> {
        self.events
            .lock()
            .expect("coordinator lock poisoned")
            .push(event.clone());
        Ok(Some(format!("https://share.test/{}", event.repo_id)))
    }
}

/// A server running on a background thread for the duration of a test.
pub struct TestServer {
    _dir: TempDir,
    pub server: Arc<ExtServer>,
    pub coordinator: Arc<CollectingCoordinator>,
    pub manifest: PathBuf,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    /// Start a server in `dir` whose manifest contains `manifest_body`.
    pub fn start(dir: TempDir, manifest_body: &str) -> Self {
        Self::start_with(dir, manifest_body, |_| {})
    }

    /// Like [`TestServer::start`], with a chance to adjust the config.
    pub fn start_with(
        dir: TempDir,
        manifest_body: &str,
        tweak: impl FnOnce(&mut Config),
    ) -> Self {
        // Written before the server starts so the first snapshot sees it
        let manifest = dir.path().join("repos.toml");
        fs::write(&manifest, manifest_body).expect("Failed to write manifest");

        let mut config = Config {
            socket_path: dir.path().join("ext.sock"),
            repos_manifest: manifest.clone(),
            log_file: dir.path().join("server.log"),
            ..Config::default()
        };
        tweak(&mut config);

        let cache = Arc::new(RepoInfoCache::with_clock(
            Box::new(ManifestProvider::new(&manifest)),
            Box::new(SystemClock),
            config.refresh_window(),
        ));
        let coordinator = Arc::new(CollectingCoordinator::default());
        let shared: Arc<dyn ShareLinkCoordinator> = coordinator.clone();
        let server = Arc::new(ExtServer::with_parts(config, cache, shared));

        let listener = bind_listener(server.socket_path()).expect("Failed to bind socket");
        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || runner.serve(listener));

        Self {
            _dir: dir,
            server,
            coordinator,
            manifest,
            handle: Some(handle),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.server.socket_path()
    }

    pub fn connect(&self) -> UnixStream {
        let stream = UnixStream::connect(self.socket_path()).expect("Failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("Failed to set read timeout");
        stream
    }

    /// Replace the manifest the server reads from.
    pub fn write_manifest(&self, body: &str) {
        fs::write(&self.manifest, body).expect("Failed to write manifest");
    }

    pub fn shared_events(&self) -> Vec<ShareLinkEvent> {
        self.coordinator
            .events
            .lock()
            .expect("coordinator lock poisoned")
            .clone()
    }

    /// Stop the server and wait for the accept loop to return.
    pub fn stop(mut self) -> Result<()> {
        self.server.shutdown();
        match self.handle.take() {
            Some(handle) => handle.join().expect("server thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Create a worktree directory named `name` under `dir`.
pub fn worktree(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::create_dir_all(&path).expect("Failed to create worktree");
    path
}

/// Manifest with one `[[repo]]` table per `(id, name, worktree, state)`.
pub fn manifest(entries: &[(&str, &str, &Path, &str)]) -> String {
    entries
        .iter()
        .map(|(id, name, worktree, state)| {
            format!(
                "[[repo]]\nid = \"{id}\"\nname = \"{name}\"\nworktree = \"{}\"\nstate = \"{state}\"\n",
                worktree.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
