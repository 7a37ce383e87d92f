mod client;
mod dispatch;
mod protocol;
mod server;

pub use client::{ExtClient, RepoRecord};
pub use dispatch::CommandDispatcher;
pub use protocol::{
    read_frame, read_request, read_response, write_frame, write_request, FrameError, Request,
    CMD_GET_SHARE_LINK, CMD_LIST_REPOS, MAX_FRAME_LEN,
};
pub use server::{bind_listener, ExtServer, ServerStatus};
