//! Golden test vectors for deterministic verification.
//!
//! Every replica must produce identical canonical bytes for the same operation
//! and identical frames for the same message, or peers stop understanding each
//! other.

use chainpad_core::{canonical_operation_bytes, canonical_root_bytes, patch_hash, root_hash};
use chainpad_core::{Patch, TextOperation};
use chainpad_sync::{ChannelId, Frame, Message, PeerId};

/// A golden operation vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Channel of the document.
    pub channel: &'static str,
    /// Initial content of the document.
    pub initial: &'static str,
    pub offset: usize,
    pub to_remove: usize,
    pub to_insert: &'static str,
    /// Expected canonical CBOR of the operation (hex).
    pub expected_operation_cbor: &'static str,
    /// Expected canonical CBOR of the root material (hex).
    pub expected_root_cbor: &'static str,
}

impl GoldenVector {
    pub fn operation(&self) -> TextOperation {
        TextOperation::new(self.offset, self.to_remove, self.to_insert)
    }

    /// The patch applying this vector's operation on the document root.
    pub fn patch(&self) -> Patch {
        Patch::new(root_hash(self.channel, self.initial), self.operation())
    }
}

/// Get all golden operation vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "insert into empty document",
            channel: "y",
            initial: "",
            offset: 0,
            to_remove: 0,
            to_insert: "hi",
            expected_operation_cbor: "830000626869",
            expected_root_cbor: "82617960",
        },
        GoldenVector {
            name: "replace with multi-byte text",
            channel: "y",
            initial: "añb",
            offset: 1,
            to_remove: 1,
            to_insert: "é",
            expected_operation_cbor: "83010162c3a9",
            expected_root_cbor: "8261796461c3b162",
        },
        GoldenVector {
            name: "wide integers",
            channel: "doc",
            initial: "",
            offset: 24,
            to_remove: 300,
            to_insert: "",
            expected_operation_cbor: "83181819012c60",
            expected_root_cbor: "8263646f6360",
        },
    ]
}

/// Verify every golden vector.
///
/// Returns `(name, matches, patch hash hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let op = v.operation();
            let operation_ok = hex::encode(canonical_operation_bytes(&op)) == v.expected_operation_cbor;
            let root_ok =
                hex::encode(canonical_root_bytes(v.channel, v.initial)) == v.expected_root_cbor;
            let hash = patch_hash(&root_hash(v.channel, v.initial), &op);
            (v.name.to_string(), operation_ok && root_ok, hash.to_hex())
        })
        .collect()
}

/// A golden frame vector.
#[derive(Debug, Clone)]
pub struct FrameVector {
    pub name: &'static str,
    pub frame: Frame,
    pub expected: &'static [u8],
}

/// Get all golden frame vectors.
pub fn frame_vectors() -> Vec<FrameVector> {
    let frame = |channel: Option<&str>, peer: &str, message: Message| Frame {
        channel: channel.map(ChannelId::from),
        peer: PeerId::from(peer),
        key: "abc".into(),
        message,
    };
    vec![
        FrameVector {
            name: "handshake",
            frame: frame(Some("y"), "alice", Message::Register),
            expected: b"1:y5:alice3:abc3:[0]",
        },
        FrameVector {
            name: "relay acknowledgement",
            frame: frame(None, "", Message::RegisterAck),
            expected: b"0:3:abc3:[1]",
        },
        FrameVector {
            name: "history request",
            frame: frame(Some("y"), "bob", Message::HistoryRequest),
            expected: b"1:y3:bob3:abc3:[3]",
        },
    ]
}
