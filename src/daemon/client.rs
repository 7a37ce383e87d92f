//! Client side of the extension protocol.

use super::protocol::{
    read_response, write_request, Request, CMD_GET_SHARE_LINK, CMD_LIST_REPOS,
};
use crate::models::RepoStatus;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// One record of a `list-repos` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRecord {
    pub id: String,
    pub name: String,
    pub worktree: String,
    pub status: RepoStatus,
}

impl RepoRecord {
    /// Parse a `list-repos` response body. An empty body means no repos.
    pub fn parse_all(body: &str) -> Result<Vec<Self>> {
        body.lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                let [id, name, worktree, status] = fields.as_slice() else {
                    bail!("Malformed repo record: {line}");
                };
                Ok(Self {
                    id: id.to_string(),
                    name: name.to_string(),
                    worktree: worktree.to_string(),
                    status: status.parse()?,
                })
            })
            .collect()
    }
}

pub struct ExtClient {
    stream: UnixStream,
}

impl ExtClient {
    /// Connect to the server socket.
    pub fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).with_context(|| {
            format!("Failed to connect to server socket: {}", socket_path.display())
        })?;
        stream
            .set_read_timeout(Some(Duration::from_secs(30)))
            .context("Failed to set read timeout")?;
        Ok(Self { stream })
    }

    /// Send one request and wait for its response payload.
    pub fn request(&mut self, request: &Request) -> Result<String> {
        write_request(&mut self.stream, request).context("Failed to send request")?;
        read_response(&mut self.stream).context("Failed to read response")
    }

    /// List repos with their display status.
    ///
    /// # Arguments
    /// * `since` - Last snapshot time the caller has seen (0 for none)
    pub fn list_repos(&mut self, since: u64) -> Result<Vec<RepoRecord>> {
        let body = self.request(&Request::new(CMD_LIST_REPOS, vec![since.to_string()]))?;
        RepoRecord::parse_all(&body)
    }

    /// Ask the server to create a share link for `path`.
    pub fn get_share_link(&mut self, path: &str) -> Result<()> {
        self.request(&Request::new(CMD_GET_SHARE_LINK, vec![path.to_string()]))?;
        Ok(())
    }
}
