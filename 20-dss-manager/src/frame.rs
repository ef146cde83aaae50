//! Frame I/O over a byte stream.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::{HEADER_LEN, PROTOCOL_VERSION};

/// One received header-plus-payload unit.
///
/// `msg_type` stays a raw byte so that unknown types can still be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub txn_id: u32,
    pub payload: Bytes,
}

/// Writes header and payload with a single `write_all`.
pub async fn send_frame<W>(
    writer: &mut W,
    msg_type: u8,
    txn_id: u32,
    payload: &[u8],
) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::PayloadTooLarge { len: payload.len() })?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(msg_type);
    buf.put_u32(txn_id);
    buf.put_u32(len);
    buf.put_slice(payload);

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads exactly one frame.
///
/// The version byte is checked before the payload is read.
pub async fn receive_frame<R>(reader: &mut R) -> ProtocolResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let version = header[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::ProtocolVersionMismatch { found: version });
    }
    let msg_type = header[1];
    let txn_id = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
    let payload_len = u32::from_be_bytes([header[6], header[7], header[8], header[9]]) as u64;

    // Grow the buffer as bytes arrive instead of trusting the declared length up front.
    let mut payload = Vec::new();
    let read = reader.take(payload_len).read_to_end(&mut payload).await?;
    if (read as u64) < payload_len {
        return Err(ProtocolError::ConnectionClosed);
    }

    Ok(Frame {
        msg_type,
        txn_id,
        payload: Bytes::from(payload),
    })
}
