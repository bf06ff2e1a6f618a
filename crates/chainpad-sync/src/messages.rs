//! Wire messages and frames.
//!
//! A frame carries identity fields followed by a JSON message body:
//!
//! ```text
//! outbound:  <channel> <peer> <key> <body>
//! inbound:   <peer> <key> <body>          (relay stripped the channel)
//!        or  <channel> <peer> <key> <body>
//! ```
//!
//! Bodies are JSON arrays tagged by their first element:
//! `[0]` register, `[1]` register ack, `[2, patch]` patch, `[3]` history request.

use bytes::Bytes;
use serde_json::Value;
use std::fmt;

use chainpad_core::Patch;

use crate::codec::{decode_fields, encode_fields};
use crate::error::{Result, SyncError};

/// Identity of a peer on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty sender used by relay acknowledgements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of a shared document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message tags (first element of the body array).
pub mod tags {
    pub const REGISTER: u64 = 0;
    pub const REGISTER_ACK: u64 = 1;
    pub const PATCH: u64 = 2;
    pub const HISTORY_REQUEST: u64 = 3;
}

/// Sync messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Join the channel.
    Register,
    /// The join was accepted.
    RegisterAck,
    /// A committed patch.
    Patch(Patch),
    /// Ask peers to replay their chain.
    HistoryRequest,
}

impl Message {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Register => "register",
            Message::RegisterAck => "register_ack",
            Message::Patch(_) => "patch",
            Message::HistoryRequest => "history_request",
        }
    }

    /// Encode the JSON body.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        let encoded = match self {
            Message::Register => serde_json::to_vec(&[tags::REGISTER]),
            Message::RegisterAck => serde_json::to_vec(&[tags::REGISTER_ACK]),
            Message::Patch(patch) => serde_json::to_vec(&(tags::PATCH, patch)),
            Message::HistoryRequest => serde_json::to_vec(&[tags::HISTORY_REQUEST]),
        };
        encoded.map_err(|e| SyncError::Format(e.to_string()))
    }

    /// Decode and structurally validate a JSON body.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| SyncError::Format(e.to_string()))?;
        let items = value
            .as_array()
            .ok_or_else(|| SyncError::Format("body is not an array".into()))?;
        let tag = items
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| SyncError::Format("missing message tag".into()))?;

        let expect_len = |n: usize| {
            if items.len() == n {
                Ok(())
            } else {
                Err(SyncError::Format(format!(
                    "message {} expects {} elements, found {}",
                    tag,
                    n,
                    items.len()
                )))
            }
        };

        match tag {
            tags::REGISTER => expect_len(1).map(|_| Message::Register),
            tags::REGISTER_ACK => expect_len(1).map(|_| Message::RegisterAck),
            tags::PATCH => {
                expect_len(2)?;
                let patch: Patch = serde_json::from_value(items[1].clone())
                    .map_err(|e| SyncError::Format(format!("invalid patch: {}", e)))?;
                Ok(Message::Patch(patch))
            }
            tags::HISTORY_REQUEST => expect_len(1).map(|_| Message::HistoryRequest),
            other => Err(SyncError::Format(format!("unknown message tag {}", other))),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel, absent when the relay stripped it.
    pub channel: Option<ChannelId>,
    /// Sender; empty for relay acknowledgements.
    pub peer: PeerId,
    /// Validation key shared by the channel.
    pub key: String,
    /// The message.
    pub message: Message,
}

impl Frame {
    /// Encode to netstring fields.
    pub fn encode(&self) -> Result<Bytes> {
        let body = self.message.to_body()?;
        let frame = match &self.channel {
            Some(channel) => encode_fields(&[
                channel.as_str().as_bytes(),
                self.peer.as_str().as_bytes(),
                self.key.as_bytes(),
                body.as_slice(),
            ]),
            None => encode_fields(&[
                self.peer.as_str().as_bytes(),
                self.key.as_bytes(),
                body.as_slice(),
            ]),
        };
        Ok(frame)
    }

    /// Decode from netstring fields.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let fields = decode_fields(data)?;
        let (channel, peer, key, body) = match fields.as_slice() {
            [peer, key, body] => (None, *peer, *key, *body),
            [channel, peer, key, body] => (Some(*channel), *peer, *key, *body),
            other => {
                return Err(SyncError::Format(format!(
                    "expected 3 or 4 fields, found {}",
                    other.len()
                )))
            }
        };

        Ok(Self {
            channel: channel.map(|c| utf8(c, "channel").map(ChannelId::new)).transpose()?,
            peer: PeerId::new(utf8(peer, "peer")?),
            key: utf8(key, "key")?,
            message: Message::from_body(body)?,
        })
    }
}

fn utf8(bytes: &[u8], field: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| SyncError::Format(format!("{} is not valid UTF-8", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpad_core::{PatchHash, TextOperation};

    fn frame(channel: Option<&str>, peer: &str, message: Message) -> Frame {
        Frame {
            channel: channel.map(ChannelId::from),
            peer: PeerId::from(peer),
            key: "abc".into(),
            message,
        }
    }

    #[test]
    fn test_register_literal() {
        let encoded = frame(Some("y"), "alice", Message::Register).encode().unwrap();
        assert_eq!(&encoded[..], b"1:y5:alice3:abc3:[0]");
    }

    #[test]
    fn test_ack_literal_decodes() {
        let decoded = Frame::decode(b"0:3:abc3:[1]").unwrap();
        assert_eq!(decoded, frame(None, "", Message::RegisterAck));
        assert!(decoded.peer.is_empty());
    }

    #[test]
    fn test_patch_body_shape() {
        let patch = Patch::new(PatchHash::ZERO, TextOperation::insert(0, "hi"));
        let body = Message::Patch(patch.clone()).to_body().unwrap();
        let expected = format!(
            r#"[2,{{"operation":{{"offset":0,"to_remove":0,"to_insert":"hi"}},"parent":"{}","hash":"{}"}}]"#,
            PatchHash::ZERO.to_hex(),
            patch.hash().to_hex()
        );
        assert_eq!(String::from_utf8(body).unwrap(), expected);
    }

    #[test]
    fn test_patch_frame_decodes() {
        let patch = Patch::new(PatchHash::ZERO, TextOperation::new(1, 1, "é"));
        let original = frame(Some("chan"), "bob", Message::Patch(patch));
        let decoded = Frame::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_rejects_bad_bodies() {
        let bodies: [&[u8]; 7] = [b"{}", b"[]", b"[9]", b"[0,1]", b"[2]", b"[\"0\"]", b"not json"];
        for body in bodies {
            assert!(
                matches!(Message::from_body(body), Err(SyncError::Format(_))),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_rejects_negative_offset() {
        let body = format!(
            r#"[2,{{"operation":{{"offset":-1,"to_remove":0,"to_insert":""}},"parent":"{0}","hash":"{0}"}}]"#,
            PatchHash::ZERO.to_hex()
        );
        assert!(Message::from_body(body.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(Frame::decode(b"3:abc3:[0]").is_err());
        assert!(Frame::decode(b"1:a1:b1:c1:d3:[0]").is_err());
    }

    #[test]
    fn test_rejects_non_utf8_identity() {
        let fields: [&[u8]; 3] = [&[0xff], b"abc", b"[0]"];
        let data = encode_fields(&fields);
        assert!(matches!(Frame::decode(&data), Err(SyncError::Format(_))));
    }
}
