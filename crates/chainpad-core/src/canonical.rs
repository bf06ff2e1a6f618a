//! Canonical CBOR encoding for deterministic hashing.
//!
//! Follows RFC 8949 Core Deterministic Encoding for the subset used here:
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Text strings are raw UTF-8
//!
//! An operation encodes as the array `[offset, to_remove, to_insert]`. The
//! document root encodes as `[channel, initial]`. Every replica must produce
//! identical bytes for the same operation or the chain forks.

use crate::operation::TextOperation;

/// Number of fields in an encoded operation.
const OPERATION_FIELDS: u64 = 3;

/// Encode an operation to canonical CBOR bytes.
pub fn canonical_operation_bytes(op: &TextOperation) -> Vec<u8> {
    let mut buf = Vec::with_capacity(op.to_insert.len() + 16);
    encode_uint(&mut buf, 4, OPERATION_FIELDS);
    encode_uint(&mut buf, 0, op.offset as u64);
    encode_uint(&mut buf, 0, op.to_remove as u64);
    encode_text(&mut buf, &op.to_insert);
    buf
}

/// Encode the root material of a document: its channel and initial content.
pub fn canonical_root_bytes(channel: &str, initial: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(channel.len() + initial.len() + 8);
    encode_uint(&mut buf, 4, 2);
    encode_text(&mut buf, channel);
    encode_text(&mut buf, initial);
    buf
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_encoding_layout() {
        let op = TextOperation::new(3, 1, "hi");
        let bytes = canonical_operation_bytes(&op);
        assert_eq!(bytes, vec![0x83, 0x03, 0x01, 0x62, b'h', b'i']);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 70_000);
        assert_eq!(buf, vec![0x1a, 0x00, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn test_encoding_matches_generic_cbor() {
        let op = TextOperation::new(300, 2, "héllo");
        let bytes = canonical_operation_bytes(&op);
        let decoded: (usize, usize, String) = ciborium::from_reader(&bytes[..]).unwrap();
        assert_eq!(decoded, (300, 2, "héllo".to_string()));

        let mut reencoded = Vec::new();
        ciborium::into_writer(&(300u64, 2u64, "héllo"), &mut reencoded).unwrap();
        assert_eq!(reencoded, bytes);
    }

    #[test]
    fn test_root_encoding_matches_generic_cbor() {
        let bytes = canonical_root_bytes("doc", "añb");
        let decoded: (String, String) = ciborium::from_reader(&bytes[..]).unwrap();
        assert_eq!(decoded, ("doc".to_string(), "añb".to_string()));
    }

    #[test]
    fn test_root_bytes_distinguish_fields() {
        assert_ne!(canonical_root_bytes("ab", "c"), canonical_root_bytes("a", "bc"));
    }
}
