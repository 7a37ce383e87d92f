use std::io::{self, Read, Write};
use thiserror::Error;

/// Upper bound on a declared frame length (10 MB).
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

/// Command name for the repo status listing.
pub const CMD_LIST_REPOS: &str = "list-repos";
/// Command name for share-link generation.
pub const CMD_GET_SHARE_LINK: &str = "get-share-link";

/// Failure reading or decoding a frame. Any of these ends the connection.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Peer closed the stream before sending a new frame
    #[error("connection closed by peer")]
    Closed,
    /// Fewer bytes arrived than the frame declared
    #[error("short read: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("zero-length request frame")]
    EmptyFrame,
    #[error("request contains no fields")]
    EmptyRequest,
    #[error("frame too large: {0} bytes")]
    TooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether this is an orderly disconnect rather than a protocol or
    /// transport failure.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, FrameError::Closed)
    }
}

/// One decoded request: a command name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Decode request text: tab-separated fields, empty fields dropped.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let mut fields = text.split('\t').filter(|f| !f.is_empty()).map(String::from);
        let command = fields.next().ok_or(FrameError::EmptyRequest)?;
        Ok(Self {
            command,
            args: fields.collect(),
        })
    }

    /// Encode as request text.
    pub fn encode(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Read until `buf` is full or the stream ends, returning bytes read.
fn read_full<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one length-prefixed frame and return its payload.
///
/// Format: 4-byte native-endian length prefix + payload bytes. Both peers
/// run on the same machine, so native byte order is shared.
///
/// # Arguments
/// * `stream` - The stream to read from
///
/// # Returns
/// The payload, which may be empty. Callers reading requests must reject
/// empty payloads themselves (see [`read_request`]).
pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_bytes = [0u8; 4];
    match read_full(stream, &mut len_bytes)? {
        0 => return Err(FrameError::Closed),
        4 => {}
        n => {
            return Err(FrameError::Truncated {
                expected: 4,
                actual: n,
            })
        }
    }
    let len = u32::from_ne_bytes(len_bytes) as usize;

    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    let read = read_full(stream, &mut payload)?;
    if read != len {
        return Err(FrameError::Truncated {
            expected: len,
            actual: read,
        });
    }
    Ok(payload)
}

/// Read and decode one request frame.
///
/// A zero-length frame or a frame with no fields is a protocol error.
pub fn read_request<R: Read>(stream: &mut R) -> Result<Request, FrameError> {
    let payload = read_frame(stream)?;
    if payload.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    Request::decode(&String::from_utf8_lossy(&payload))
}

/// Write one length-prefixed frame.
///
/// An empty payload is written as the length prefix alone.
pub fn write_frame<W: Write>(stream: &mut W, payload: &str) -> Result<(), FrameError> {
    let bytes = payload.as_bytes();
    let len = u32::try_from(bytes.len()).map_err(|_| FrameError::TooLarge(bytes.len()))?;

    stream.write_all(&len.to_ne_bytes())?;
    if !bytes.is_empty() {
        stream.write_all(bytes)?;
    }
    stream.flush()?;
    Ok(())
}

/// Encode and write one request frame.
pub fn write_request<W: Write>(stream: &mut W, request: &Request) -> Result<(), FrameError> {
    write_frame(stream, &request.encode())
}

/// Read one response frame as text.
pub fn read_response<R: Read>(stream: &mut R) -> Result<String, FrameError> {
    let payload = read_frame(stream)?;
    Ok(String::from_utf8_lossy(&payload).into_owned())
}
