//! Process helpers for the PID-file based server lifecycle.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().map(Pid::from_raw)
}

/// Check if a process with the given PID is alive.
///
/// Sends the null signal, so nothing is delivered. `EPERM` means the
/// process exists but belongs to someone else, which still counts as alive.
pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };

    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Ask the process to shut down with SIGTERM.
pub fn terminate(pid: u32) -> Result<()> {
    let target = to_pid(pid).with_context(|| format!("Invalid PID: {pid}"))?;
    kill(target, Signal::SIGTERM).with_context(|| format!("Failed to signal process {pid}"))
}
