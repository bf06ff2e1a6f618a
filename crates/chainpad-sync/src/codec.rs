//! Netstring field codec.
//!
//! A frame is a concatenation of fields, each written as
//! `<decimal byte length>:<bytes>` with no separator between fields.
//!
//! ```text
//! 1:y5:alice3:abc3:[0]   =>   ["y", "alice", "abc", "[0]"]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SyncError};

/// Codec limits.
pub mod limits {
    /// Longest accepted length prefix, in decimal digits.
    pub const MAX_LENGTH_DIGITS: usize = 10;
}

/// Encode fields into a single frame.
pub fn encode_fields<F: AsRef<[u8]>>(fields: &[F]) -> Bytes {
    let size = fields
        .iter()
        .map(|f| f.as_ref().len() + limits::MAX_LENGTH_DIGITS + 1)
        .sum();
    let mut buf = BytesMut::with_capacity(size);
    for field in fields {
        let field = field.as_ref();
        buf.put_slice(field.len().to_string().as_bytes());
        buf.put_u8(b':');
        buf.put_slice(field);
    }
    buf.freeze()
}

/// Split a frame into its fields.
pub fn decode_fields(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut fields = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let colon = rest
            .iter()
            .take(limits::MAX_LENGTH_DIGITS + 1)
            .position(|&b| b == b':')
            .ok_or_else(|| SyncError::Format("missing or overlong length prefix".into()))?;
        let digits = &rest[..colon];
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(SyncError::Format(format!(
                "invalid length prefix: {:?}",
                String::from_utf8_lossy(digits)
            )));
        }
        let len: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SyncError::Format("length prefix out of range".into()))?;

        let body = &rest[colon + 1..];
        if body.len() < len {
            return Err(SyncError::Format(format!(
                "truncated field: expected {} bytes, found {}",
                len,
                body.len()
            )));
        }
        fields.push(&body[..len]);
        rest = &body[len..];
    }

    Ok(fields)
}
