use std::io;

use thiserror::Error;

/// Failures of the wire layer: framing, field encoding and field decoding.
///
/// Semantic outcomes such as an unknown id or too few disks are not errors
/// here; they travel back to the peer as a [`crate::protocol::Status`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bad protocol version {found}")]
    ProtocolVersionMismatch { found: u8 },
    #[error("truncated payload")]
    TruncatedPayload,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("string too long: {len} bytes")]
    StringTooLong { len: usize },
    #[error("list too long: {len} elements")]
    ListTooLong { len: usize },
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    #[error("unknown status {0}")]
    UnknownStatus(u8),
    #[error("unknown msg_type {0}")]
    UnknownMessageType(u8),
    #[error("payload of {len} bytes does not fit a frame")]
    PayloadTooLarge { len: usize },
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(err),
        }
    }
}

impl ProtocolError {
    /// True when the peer simply went away rather than misbehaving.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::ConnectionClosed)
    }
}

pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
