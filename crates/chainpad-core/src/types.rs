//! Strong type definitions for ChainPad.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A 32-byte patch identifier, computed as Blake3 over the parent hash and the
/// canonical bytes of the operation.
///
/// Ordering is lexicographic over the raw bytes; the log uses it to break ties
/// between branches of equal depth.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchHash(pub [u8; 32]);

impl PatchHash {
    /// Create a new PatchHash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero hash (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for PatchHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PatchHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PatchHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for PatchHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// Hashes travel as lowercase hex inside JSON message bodies.
impl Serialize for PatchHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PatchHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_hash_hex_roundtrip() {
        let hash = PatchHash::from_bytes([0x42; 32]);
        let hex = hash.to_hex();
        let recovered = PatchHash::from_hex(&hex).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_patch_hash_display() {
        let hash = PatchHash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_patch_hash_rejects_short_hex() {
        assert!(PatchHash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_patch_hash_ordering_is_bytewise() {
        let mut low = [0u8; 32];
        low[31] = 1;
        let mut high = [0u8; 32];
        high[0] = 1;
        assert!(PatchHash(low) < PatchHash(high));
    }

    #[test]
    fn test_patch_hash_json_is_hex_string() {
        let hash = PatchHash::from_bytes([0x01; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: PatchHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
