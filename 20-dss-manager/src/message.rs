//! Typed request and response payloads.
//!
//! Each variant maps to exactly one message type; `encode` produces the
//! payload bytes and `decode` reads them back with a [`Cursor`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{Cursor, put_string, put_u32_list};
use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::{MessageType, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    RegisterUser {
        name: String,
        listen_port: u16,
    },
    RegisterDisk {
        name: String,
        listen_port: u16,
        capacity_bytes: u64,
        zone: String,
    },
    ConfigureDss {
        disk_count: u16,
        policy: String,
        constraints: String,
    },
    DeregisterUser {
        user_id: u32,
    },
    DeregisterDisk {
        disk_id: u32,
    },
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::RegisterUser { .. } => MessageType::RegisterUserReq,
            Request::RegisterDisk { .. } => MessageType::RegisterDiskReq,
            Request::ConfigureDss { .. } => MessageType::ConfigureDssReq,
            Request::DeregisterUser { .. } => MessageType::DeregisterUserReq,
            Request::DeregisterDisk { .. } => MessageType::DeregisterDiskReq,
        }
    }

    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut buf = BytesMut::new();
        match self {
            Request::RegisterUser { name, listen_port } => {
                put_string(&mut buf, name)?;
                buf.put_u16(*listen_port);
            }
            Request::RegisterDisk {
                name,
                listen_port,
                capacity_bytes,
                zone,
            } => {
                put_string(&mut buf, name)?;
                buf.put_u16(*listen_port);
                buf.put_u64(*capacity_bytes);
                put_string(&mut buf, zone)?;
            }
            Request::ConfigureDss {
                disk_count,
                policy,
                constraints,
            } => {
                buf.put_u16(*disk_count);
                put_string(&mut buf, policy)?;
                put_string(&mut buf, constraints)?;
            }
            Request::DeregisterUser { user_id } => buf.put_u32(*user_id),
            Request::DeregisterDisk { disk_id } => buf.put_u32(*disk_id),
        }
        Ok(buf.freeze())
    }

    /// Decodes a request payload. Response types and unknown bytes are both
    /// reported as [`ProtocolError::UnknownMessageType`].
    pub fn decode(msg_type: u8, payload: Bytes) -> ProtocolResult<Self> {
        let mut cursor = Cursor::new(payload);
        let request = match MessageType::from_u8(msg_type) {
            Some(MessageType::RegisterUserReq) => Request::RegisterUser {
                name: cursor.string()?,
                listen_port: cursor.u16()?,
            },
            Some(MessageType::RegisterDiskReq) => Request::RegisterDisk {
                name: cursor.string()?,
                listen_port: cursor.u16()?,
                capacity_bytes: cursor.u64()?,
                zone: cursor.string()?,
            },
            Some(MessageType::ConfigureDssReq) => Request::ConfigureDss {
                disk_count: cursor.u16()?,
                policy: cursor.string()?,
                constraints: cursor.string()?,
            },
            Some(MessageType::DeregisterUserReq) => Request::DeregisterUser {
                user_id: cursor.u32()?,
            },
            Some(MessageType::DeregisterDiskReq) => Request::DeregisterDisk {
                disk_id: cursor.u32()?,
            },
            _ => return Err(ProtocolError::UnknownMessageType(msg_type)),
        };
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    RegisterUser {
        status: Status,
        user_id: u32,
    },
    RegisterDisk {
        status: Status,
        disk_id: u32,
    },
    ConfigureDss {
        status: Status,
        dss_id: u32,
        disk_ids: Vec<u32>,
    },
    DeregisterUser {
        status: Status,
    },
    DeregisterDisk {
        status: Status,
    },
    Error {
        status: Status,
        message: String,
    },
}

impl Response {
    /// A failed configure carries `dss_id = 0` and no disks.
    pub fn configure_failed(status: Status) -> Self {
        Response::ConfigureDss {
            status,
            dss_id: 0,
            disk_ids: Vec::new(),
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Response::Error {
            status,
            message: message.into(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Response::RegisterUser { .. } => MessageType::RegisterUserResp,
            Response::RegisterDisk { .. } => MessageType::RegisterDiskResp,
            Response::ConfigureDss { .. } => MessageType::ConfigureDssResp,
            Response::DeregisterUser { .. } => MessageType::DeregisterUserResp,
            Response::DeregisterDisk { .. } => MessageType::DeregisterDiskResp,
            Response::Error { .. } => MessageType::ErrorResp,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::RegisterUser { status, .. }
            | Response::RegisterDisk { status, .. }
            | Response::ConfigureDss { status, .. }
            | Response::DeregisterUser { status }
            | Response::DeregisterDisk { status }
            | Response::Error { status, .. } => *status,
        }
    }

    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.status().as_u8());
        match self {
            Response::RegisterUser { user_id, .. } => buf.put_u32(*user_id),
            Response::RegisterDisk { disk_id, .. } => buf.put_u32(*disk_id),
            Response::ConfigureDss {
                dss_id, disk_ids, ..
            } => {
                buf.put_u32(*dss_id);
                put_u32_list(&mut buf, disk_ids)?;
            }
            Response::DeregisterUser { .. } | Response::DeregisterDisk { .. } => {}
            Response::Error { message, .. } => put_string(&mut buf, message)?,
        }
        Ok(buf.freeze())
    }

    pub fn decode(msg_type: u8, payload: Bytes) -> ProtocolResult<Self> {
        let Some(ty) = MessageType::from_u8(msg_type) else {
            return Err(ProtocolError::UnknownMessageType(msg_type));
        };
        let mut cursor = Cursor::new(payload);
        let status = match ty {
            MessageType::RegisterUserResp
            | MessageType::RegisterDiskResp
            | MessageType::ConfigureDssResp
            | MessageType::DeregisterUserResp
            | MessageType::DeregisterDiskResp
            | MessageType::ErrorResp => read_status(&mut cursor)?,
            _ => return Err(ProtocolError::UnknownMessageType(msg_type)),
        };

        let response = match ty {
            MessageType::RegisterUserResp => Response::RegisterUser {
                status,
                user_id: cursor.u32()?,
            },
            MessageType::RegisterDiskResp => Response::RegisterDisk {
                status,
                disk_id: cursor.u32()?,
            },
            MessageType::ConfigureDssResp => Response::ConfigureDss {
                status,
                dss_id: cursor.u32()?,
                disk_ids: cursor.u32_list()?,
            },
            MessageType::DeregisterUserResp => Response::DeregisterUser { status },
            MessageType::DeregisterDiskResp => Response::DeregisterDisk { status },
            _ => Response::Error {
                status,
                message: cursor.string()?,
            },
        };
        Ok(response)
    }
}

fn read_status(cursor: &mut Cursor) -> ProtocolResult<Status> {
    let raw = cursor.u8()?;
    Status::from_u8(raw).ok_or(ProtocolError::UnknownStatus(raw))
}
