//! Field-level encoding for frame payloads.
//!
//! Integers are big-endian. Strings are a u16 byte count followed by UTF-8
//! bytes; u32 lists are a u16 element count followed by the elements.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::{MAX_LIST_LEN, MAX_STRING_LEN};

pub fn put_string(buf: &mut BytesMut, value: &str) -> ProtocolResult<()> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(ProtocolError::StringTooLong { len: bytes.len() });
    }
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

pub fn put_u32_list(buf: &mut BytesMut, values: &[u32]) -> ProtocolResult<()> {
    if values.len() > MAX_LIST_LEN {
        return Err(ProtocolError::ListTooLong { len: values.len() });
    }
    buf.reserve(2 + values.len() * 4);
    buf.put_u16(values.len() as u16);
    for value in values {
        buf.put_u32(*value);
    }
    Ok(())
}

/// Read cursor over one payload.
///
/// The payload is already cut to the header's declared length, so every
/// read only has to check what is left in `buf`.
#[derive(Debug)]
pub struct Cursor {
    buf: Bytes,
}

impl Cursor {
    pub fn new(payload: Bytes) -> Self {
        Self { buf: payload }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize) -> ProtocolResult<()> {
        if self.buf.remaining() < n {
            return Err(ProtocolError::TruncatedPayload);
        }
        Ok(())
    }

    pub fn u8(&mut self) -> ProtocolResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> ProtocolResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self) -> ProtocolResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn u64(&mut self) -> ProtocolResult<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn string(&mut self) -> ProtocolResult<String> {
        let len = self.u16()? as usize;
        self.need(len)?;
        let raw = self.buf.copy_to_bytes(len);
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }

    pub fn u32_list(&mut self) -> ProtocolResult<Vec<u32>> {
        let count = self.u16()? as usize;
        self.need(count * 4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.buf.get_u32());
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        let mut buf = BytesMut::new();
        buf.put_u16(0x0102);
        buf.put_u32(0x0304_0506);
        buf.put_u64(0x0708_090A_0B0C_0D0E);
        assert_eq!(
            &buf[..],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]
        );

        let mut cursor = Cursor::new(buf.freeze());
        assert_eq!(cursor.u16().unwrap(), 0x0102);
        assert_eq!(cursor.u32().unwrap(), 0x0304_0506);
        assert_eq!(cursor.u64().unwrap(), 0x0708_090A_0B0C_0D0E);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn string_prefix_counts_utf8_bytes() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "zoné").unwrap();
        assert_eq!(&buf[..2], &[0, 5]);

        let mut cursor = Cursor::new(buf.freeze());
        assert_eq!(cursor.string().unwrap(), "zoné");
    }

    #[test]
    fn strings_at_the_limit_round_trip() {
        let empty = String::new();
        let longest = "a".repeat(MAX_STRING_LEN);

        let mut buf = BytesMut::new();
        put_string(&mut buf, &empty).unwrap();
        put_string(&mut buf, &longest).unwrap();

        let mut cursor = Cursor::new(buf.freeze());
        assert_eq!(cursor.string().unwrap(), empty);
        assert_eq!(cursor.string().unwrap(), longest);
    }

    #[test]
    fn oversized_string_is_rejected() {
        let mut buf = BytesMut::new();
        let err = put_string(&mut buf, &"a".repeat(MAX_STRING_LEN + 1)).unwrap_err();
        assert!(matches!(err, ProtocolError::StringTooLong { len: 65536 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn lists_at_the_limit_round_trip() {
        let longest: Vec<u32> = (0..MAX_LIST_LEN as u32).collect();

        let mut buf = BytesMut::new();
        put_u32_list(&mut buf, &[]).unwrap();
        put_u32_list(&mut buf, &longest).unwrap();

        let mut cursor = Cursor::new(buf.freeze());
        assert!(cursor.u32_list().unwrap().is_empty());
        assert_eq!(cursor.u32_list().unwrap(), longest);
    }

    #[test]
    fn oversized_list_is_rejected() {
        let mut buf = BytesMut::new();
        let values = vec![7u32; MAX_LIST_LEN + 1];
        let err = put_u32_list(&mut buf, &values).unwrap_err();
        assert!(matches!(err, ProtocolError::ListTooLong { len: 65536 }));
    }

    #[test]
    fn every_short_read_is_truncation() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "disk-a").unwrap();
        buf.put_u64(42);
        put_u32_list(&mut buf, &[1, 2]).unwrap();
        let full = buf.freeze();

        for cut in 0..full.len() {
            let mut cursor = Cursor::new(full.slice(..cut));
            let result = cursor
                .string()
                .and_then(|_| cursor.u64())
                .and_then(|_| cursor.u32_list());
            assert!(
                matches!(result, Err(ProtocolError::TruncatedPayload)),
                "cut at {cut} should be truncated"
            );
        }
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut cursor = Cursor::new(Bytes::from_static(&[0, 2, 0xC3, 0x28]));
        assert!(matches!(cursor.string(), Err(ProtocolError::InvalidUtf8)));
    }
}
