//! Client connection handling.

use super::super::dispatch::CommandDispatcher;
use super::super::protocol::{read_request, write_frame};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns an accepted stream for the lifetime of its handler.
///
/// Dropping the guard shuts down both directions of the stream and releases
/// the connection slot, on every exit path including a panic in dispatch.
pub(super) struct ConnectionGuard {
    stream: UnixStream,
    connection_count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    /// Take ownership of `stream`, counting it as an active connection.
    pub(super) fn new(stream: UnixStream, connection_count: Arc<AtomicUsize>) -> Self {
        connection_count.fetch_add(1, Ordering::Relaxed);
        Self {
            stream,
            connection_count,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        self.connection_count.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Serve one client until it disconnects or breaks the protocol.
///
/// Each request frame gets exactly one response frame. Read errors,
/// malformed frames and write errors all end the connection without a
/// response.
pub(super) fn handle_connection(mut guard: ConnectionGuard, dispatcher: Arc<CommandDispatcher>) {
    let stream = &mut guard.stream;
    loop {
        let request = match read_request(stream) {
            Ok(request) => request,
            Err(e) if e.is_clean_close() => {
                debug!("Connection closed by extension");
                break;
            }
            Err(e) => {
                warn!("Failed to read request from extension: {e}");
                break;
            }
        };

        let response = dispatcher.dispatch(&request);

        if let Err(e) = write_frame(stream, &response) {
            warn!("Failed to write response to extension: {e}");
            break;
        }
    }
}
