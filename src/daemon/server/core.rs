//! Core ExtServer struct and constructors.

use crate::cache::{RepoInfoCache, SystemClock};
use crate::config::Config;
use crate::process::is_process_alive;
use crate::provider::StatusProvider;
use crate::refresh::{LoggingNotifier, ShellNotifier};
use crate::share_link::{CommandCoordinator, LoggingCoordinator, ShareLinkCoordinator};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Server status indicating process and socket state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Server process not found
    NotRunning,
    /// Server process running and socket accepting connections
    Running,
    /// Server process exists but socket unreachable (hung state)
    ProcessOnly,
}

/// Extension command server listening on a Unix domain socket.
pub struct ExtServer {
    pub(super) socket_path: PathBuf,
    pub(super) pid_path: PathBuf,
    pub(super) config: Config,
    pub(super) cache: Arc<RepoInfoCache>,
    pub(super) coordinator: Arc<dyn ShareLinkCoordinator>,
    pub(super) notifier: Mutex<Option<Box<dyn ShellNotifier>>>,
    pub(super) shutdown_flag: Arc<AtomicBool>,
    pub(super) connection_count: Arc<AtomicUsize>,
}

impl ExtServer {
    /// Create a server backed by `provider`.
    ///
    /// The share-link coordinator is picked from the config: the external
    /// command if one is configured, otherwise a logging coordinator.
    ///
    /// # Arguments
    /// * `config` - Server configuration
    /// * `provider` - Upstream source of repo status
    pub fn new(config: Config, provider: Box<dyn StatusProvider>) -> Self {
        let cache = Arc::new(RepoInfoCache::with_clock(
            provider,
            Box::new(SystemClock),
            config.refresh_window(),
        ));
        let coordinator: Arc<dyn ShareLinkCoordinator> = match config
            .share_link_command
            .as_deref()
            .and_then(CommandCoordinator::from_argv)
        {
            Some(command) => Arc::new(command),
            None => Arc::new(LoggingCoordinator),
        };
        Self::with_parts(config, cache, coordinator)
    }

    /// Create a server from already built collaborators.
    pub fn with_parts(
        config: Config,
        cache: Arc<RepoInfoCache>,
        coordinator: Arc<dyn ShareLinkCoordinator>,
    ) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            pid_path: config.pid_path(),
            config,
            cache,
            coordinator,
            notifier: Mutex::new(Some(Box::new(LoggingNotifier))),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the shell notifier used by the icon refresh loop.
    pub fn with_notifier(self, notifier: Box<dyn ShellNotifier>) -> Self {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = Some(notifier);
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Flag that stops the accept loop when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the server.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    /// Check server status with a socket connectivity test.
    ///
    /// Stale PID and socket files left by a dead server are removed.
    pub fn check_status(config: &Config) -> ServerStatus {
        let pid_path = config.pid_path();
        let socket_path = &config.socket_path;

        let Some(pid) = Self::read_pid(config) else {
            // Nobody owns the socket; a connectable socket without a PID
            // file still means a foreground server is listening
            return match UnixStream::connect(socket_path) {
                Ok(_) => ServerStatus::Running,
                Err(_) => ServerStatus::NotRunning,
            };
        };

        if !is_process_alive(pid) {
            let _ = std::fs::remove_file(&pid_path);
            let _ = std::fs::remove_file(socket_path);
            return ServerStatus::NotRunning;
        }

        match UnixStream::connect(socket_path) {
            Ok(_) => ServerStatus::Running,
            Err(_) => ServerStatus::ProcessOnly,
        }
    }

    /// Check if a server is already running (responsive or hung).
    pub fn is_running(config: &Config) -> bool {
        matches!(
            Self::check_status(config),
            ServerStatus::Running | ServerStatus::ProcessOnly
        )
    }

    /// Read the PID from the PID file.
    ///
    /// # Returns
    /// `Some(pid)` if the file exists and contains a valid PID, `None` otherwise
    pub fn read_pid(config: &Config) -> Option<u32> {
        std::fs::read_to_string(config.pid_path())
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
    }
}
