//! Server lifecycle methods: bind, run, daemonize, stop.

use super::super::dispatch::CommandDispatcher;
use super::connection::{handle_connection, ConnectionGuard};
use super::core::{ExtServer, ServerStatus};
use crate::config::Config;
use crate::process::terminate;
use crate::refresh::IconRefresher;
use crate::share_link::spawn_coordinator;
use anyhow::{bail, Context, Result};
use nix::unistd::{fork, setsid, ForkResult};
use std::fs::{self, File, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Sleep between accept polls while no client is waiting.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl ExtServer {
    /// Stop a running server by signalling the process in its PID file.
    ///
    /// The signal is only sent while the socket answers. A live PID behind a
    /// dead socket may have been reused by an unrelated process, so that case
    /// is left to the user.
    ///
    /// # Returns
    /// `Ok(())` once the signal is delivered, error if no responsive server
    /// is running
    pub fn stop(config: &Config) -> Result<()> {
        let pid_path = config.pid_path();
        match Self::check_status(config) {
            ServerStatus::NotRunning => bail!("Server is not running"),
            ServerStatus::ProcessOnly => bail!(
                "Server socket {} is not accepting connections. \
                 If the server is frozen, try: kill $(cat {})",
                config.socket_path.display(),
                pid_path.display()
            ),
            ServerStatus::Running => {}
        }
        let Some(pid) = Self::read_pid(config) else {
            bail!(
                "Server has no PID file at {}; stop it from its terminal",
                pid_path.display()
            );
        };
        terminate(pid)
    }

    /// Detach the current process from the terminal (double fork).
    ///
    /// Only the grandchild returns; stdout and stderr are redirected to the
    /// configured log file. Must be called before any thread is started.
    pub fn daemonize(&self) -> Result<()> {
        match unsafe { fork() }.context("First fork failed")? {
            ForkResult::Parent { .. } => std::process::exit(0),
            ForkResult::Child => {}
        }

        setsid().context("setsid failed")?;

        match unsafe { fork() }.context("Second fork failed")? {
            ForkResult::Parent { .. } => std::process::exit(0),
            ForkResult::Child => {}
        }

        if let Some(dir) = self.config.log_file.parent() {
            fs::create_dir_all(dir).context("Failed to create log directory")?;
        }
        let log_file = File::create(&self.config.log_file).context("Failed to create log file")?;
        let log_fd = log_file.as_raw_fd();

        unsafe {
            libc::close(0);
            if libc::dup2(log_fd, 1) < 0 {
                bail!("Failed to redirect stdout");
            }
            if libc::dup2(log_fd, 2) < 0 {
                bail!("Failed to redirect stderr");
            }
        }

        Ok(())
    }

    /// Run the server in the current process until shutdown.
    pub fn run_foreground(&self) -> Result<()> {
        if let Some(dir) = self.socket_path.parent() {
            fs::create_dir_all(dir).context("Failed to create socket directory")?;
        }
        let listener = bind_listener(&self.socket_path)?;

        fs::write(&self.pid_path, format!("{}", std::process::id()))
            .context("Failed to write PID file")?;

        let result = self.serve(listener);
        self.cleanup()?;
        result
    }

    /// Accept connections on `listener` until shutdown is requested.
    ///
    /// Each accepted connection is handled on its own thread.
    ///
    /// Accept failures are fatal: any error other than `WouldBlock` or
    /// `Interrupted` stops the loop, the background threads are joined and
    /// the error is returned, so no further clients are served.
    pub fn serve(&self, listener: UnixListener) -> Result<()> {
        // Non-blocking accept so the shutdown flag is noticed
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking")?;

        let (events_tx, events_rx) = mpsc::sync_channel(self.config.event_queue_capacity.max(1));
        let coordinator_handle = spawn_coordinator(
            events_rx,
            Arc::clone(&self.coordinator),
            Arc::clone(&self.shutdown_flag),
        )?;

        let notifier = self
            .notifier
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let refresh_handle = match notifier {
            Some(notifier) => Some(
                IconRefresher::new(
                    notifier,
                    Duration::from_millis(self.config.icon_force_refresh_ms),
                )
                .spawn(
                    Arc::clone(&self.cache),
                    self.config.icon_refresh_interval(),
                    Arc::clone(&self.shutdown_flag),
                )?,
            ),
            None => None,
        };

        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&self.cache), events_tx));
        info!("Listening for extension clients on {}", self.socket_path.display());

        let mut result = Ok(());
        let mut next_id: u64 = 0;
        while !self.shutdown_flag.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    let max = self.config.max_connections;
                    if max > 0 && self.connection_count.load(Ordering::Relaxed) >= max {
                        warn!("Connection limit reached ({max}), rejecting");
                        drop(stream);
                        continue;
                    }
                    next_id += 1;
                    if let Err(e) = self.spawn_handler(stream, Arc::clone(&dispatcher), next_id) {
                        warn!("Failed to start connection handler: {e:#}");
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Failed to accept extension connection: {e}");
                    result = Err(e).context("Failed to accept connection");
                    break;
                }
            }
        }

        // Stop the background threads; connection threads finish on their own
        self.shutdown_flag.store(true, Ordering::Relaxed);
        drop(dispatcher);
        let _ = coordinator_handle.join();
        if let Some(handle) = refresh_handle {
            let _ = handle.join();
        }
        info!("Extension server stopped");
        result
    }

    fn spawn_handler(
        &self,
        stream: UnixStream,
        dispatcher: Arc<CommandDispatcher>,
        id: u64,
    ) -> Result<()> {
        // Accepted sockets may inherit the listener's non-blocking mode
        stream
            .set_nonblocking(false)
            .context("Failed to set connection to blocking")?;
        let guard = ConnectionGuard::new(stream, Arc::clone(&self.connection_count));
        debug!(connection = id, "Accepted an extension client");

        thread::Builder::new()
            .name(format!("ext-conn-{id}"))
            .spawn(move || handle_connection(guard, dispatcher))
            .context("Failed to spawn connection thread")?;
        Ok(())
    }

    /// Remove the socket and PID files.
    pub(super) fn cleanup(&self) -> Result<()> {
        // Ignore NotFound to avoid TOCTOU races with a concurrent cleanup
        for path in [&self.socket_path, &self.pid_path] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {}", path.display()));
                }
            }
        }
        Ok(())
    }
}

/// Bind the socket, replacing a stale socket file left by a dead server.
///
/// Fails if another server is accepting on the same path. The socket is
/// made owner-only after binding.
pub fn bind_listener(socket_path: &Path) -> Result<UnixListener> {
    let listener = match UnixListener::bind(socket_path) {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            if UnixStream::connect(socket_path).is_ok() {
                bail!("Server already running at {}", socket_path.display());
            }
            fs::remove_file(socket_path).context("Failed to remove stale socket file")?;
            UnixListener::bind(socket_path).context("Failed to bind Unix socket")?
        }
        Err(e) => return Err(e).context("Failed to bind Unix socket"),
    };

    fs::set_permissions(socket_path, Permissions::from_mode(0o600))
        .context("Failed to set socket permissions")?;
    Ok(listener)
}
