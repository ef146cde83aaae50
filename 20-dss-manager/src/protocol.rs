//! Constants shared by every participant of the manager protocol.
//!
//! Frames are laid out as:
//!
//! ```text
//! +---------+----------+--------------+------------------+---------------------+
//! | version | msg_type | txn_id (u32) | payload_len (u32)| payload             |
//! | 1 byte  | 1 byte   | big-endian   | big-endian       | payload_len bytes   |
//! +---------+----------+--------------+------------------+---------------------+
//! ```

use std::fmt;

/// The single protocol version this manager speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// version(1) + msg_type(1) + txn_id(4) + payload_len(4).
pub const HEADER_LEN: usize = 10;

/// Strings and lists carry a u16 length prefix.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;
pub const MAX_LIST_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    RegisterUserReq = 0x10,
    RegisterUserResp = 0x11,
    RegisterDiskReq = 0x20,
    RegisterDiskResp = 0x21,
    ConfigureDssReq = 0x30,
    ConfigureDssResp = 0x31,
    DeregisterUserReq = 0x40,
    DeregisterUserResp = 0x41,
    DeregisterDiskReq = 0x50,
    DeregisterDiskResp = 0x51,
    ErrorResp = 0x7F,
}

impl MessageType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x10 => Some(Self::RegisterUserReq),
            0x11 => Some(Self::RegisterUserResp),
            0x20 => Some(Self::RegisterDiskReq),
            0x21 => Some(Self::RegisterDiskResp),
            0x30 => Some(Self::ConfigureDssReq),
            0x31 => Some(Self::ConfigureDssResp),
            0x40 => Some(Self::DeregisterUserReq),
            0x41 => Some(Self::DeregisterUserResp),
            0x50 => Some(Self::DeregisterDiskReq),
            0x51 => Some(Self::DeregisterDiskResp),
            0x7F => Some(Self::ErrorResp),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Registration requests answer a malformed payload with `ERROR_RESP`
    /// instead of dropping the connection.
    pub fn is_registration(self) -> bool {
        matches!(self, Self::RegisterUserReq | Self::RegisterDiskReq)
    }
}

/// Result code carried as the first byte of every response payload.
///
/// `AlreadyRegistered` and `InternalError` are part of the wire contract but
/// the manager never emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    InvalidArgument = 1,
    AlreadyRegistered = 2,
    NotRegistered = 3,
    InsufficientResources = 4,
    InternalError = 5,
}

impl Status {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Ok),
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::AlreadyRegistered),
            3 => Some(Self::NotRegistered),
            4 => Some(Self::InsufficientResources),
            5 => Some(Self::InternalError),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::NotRegistered => "NOT_REGISTERED",
            Self::InsufficientResources => "INSUFFICIENT_RESOURCES",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
