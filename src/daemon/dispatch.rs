//! Command dispatch for decoded extension requests.

use super::protocol::{Request, CMD_GET_SHARE_LINK, CMD_LIST_REPOS};
use crate::cache::RepoInfoCache;
use crate::paths::{normalized_path, normalized_worktree, path_in_worktree};
use crate::share_link::ShareLinkEvent;
use std::fs;
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CommandDispatcher {
    cache: Arc<RepoInfoCache>,
    events: SyncSender<ShareLinkEvent>,
}

impl CommandDispatcher {
    pub fn new(cache: Arc<RepoInfoCache>, events: SyncSender<ShareLinkEvent>) -> Self {
        Self { cache, events }
    }

    /// Handle one request and return the response payload.
    ///
    /// The protocol has no error encoding: bad arguments and unknown
    /// commands both produce an empty response.
    pub fn dispatch(&self, request: &Request) -> String {
        match request.command.as_str() {
            CMD_LIST_REPOS => self.list_repos(&request.args),
            CMD_GET_SHARE_LINK => {
                self.get_share_link(&request.args);
                String::new()
            }
            other => {
                warn!("Unknown request command: {other}");
                String::new()
            }
        }
    }

    /// `list-repos <client_ts>`: one `id\tname\tworktree\tstatus` line per repo.
    fn list_repos(&self, args: &[String]) -> String {
        let [ts] = args else {
            return String::new();
        };
        let Ok(client_ts) = ts.parse::<u64>() else {
            return String::new();
        };

        self.cache
            .get(client_ts)
            .repos
            .iter()
            .map(|repo| {
                let worktree = normalized_worktree(&repo.worktree);
                [
                    repo.id.as_str(),
                    repo.name.as_str(),
                    worktree.as_str(),
                    repo.status().as_str(),
                ]
                .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `get-share-link <path>`: emit a share-link event for the first repo
    /// whose worktree contains `path`.
    fn get_share_link(&self, args: &[String]) {
        let [raw_path] = args else {
            return;
        };
        let path = normalized_path(raw_path);

        let snapshot = self.cache.snapshot();
        let found = snapshot.repos.iter().find_map(|repo| {
            path_in_worktree(&path, &normalized_worktree(&repo.worktree))
                .map(|inner| (repo, inner.to_string()))
        });
        let Some((repo, path_in_repo)) = found else {
            debug!("No repo contains {path}");
            return;
        };

        let is_file = fs::metadata(raw_path).map(|m| m.is_file()).unwrap_or(false);
        let event = ShareLinkEvent {
            repo_id: repo.id.clone(),
            path_in_repo,
            is_file,
        };

        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(repo = %event.repo_id, "Share link queue full, dropping request");
            }
            Err(TrySendError::Disconnected(event)) => {
                warn!(repo = %event.repo_id, "Share link coordinator is gone, dropping request");
            }
        }
    }
}
