//! Path normalization shared by the wire protocol.
//!
//! Paths exchanged with the extension always use forward slashes and never
//! carry a trailing slash, whatever the platform's native separator is.

use std::path::{Path, MAIN_SEPARATOR};

/// Convert native separators to `/` and strip one trailing slash.
///
/// Only the platform separator is rewritten; on Unix a backslash is an
/// ordinary filename character and is kept.
pub fn normalized_path(path: &str) -> String {
    let mut p = if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    };
    if p.ends_with('/') {
        p.pop();
    }
    p
}

/// Normalize a filesystem path for use on the wire.
pub fn normalized_worktree(path: &Path) -> String {
    normalized_path(&path.to_string_lossy())
}

/// Return the part of `path` inside `worktree`, if `path` lies below it.
///
/// Both arguments must already be normalized. The character right after the
/// worktree prefix must be `/`, so a worktree `/a/foo` does not match
/// `/a/foobar/x`. The worktree itself is not a match.
pub fn path_in_worktree<'a>(path: &'a str, worktree: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(worktree)?;
    let inner = rest.strip_prefix('/')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner)
}
