//! Hash chaining for patches.
//!
//! Every patch hash commits to its parent, so a hash identifies the entire
//! history leading up to it. The first patch of a document links to the root
//! hash, derived from the channel and the initial content.

use crate::canonical::{canonical_operation_bytes, canonical_root_bytes};
use crate::operation::TextOperation;
use crate::types::PatchHash;

/// Domain separation prefix for patch hashes.
const PATCH_DOMAIN: &[u8] = b"chainpad-patch-v0:";

/// Domain separation prefix for root hashes.
const ROOT_DOMAIN: &[u8] = b"chainpad-root-v0:";

/// Hash of the empty history of a document.
pub fn root_hash(channel: &str, initial: &str) -> PatchHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ROOT_DOMAIN);
    hasher.update(&canonical_root_bytes(channel, initial));
    PatchHash(*hasher.finalize().as_bytes())
}

/// Hash of `op` appended after `parent`.
pub fn patch_hash(parent: &PatchHash, op: &TextOperation) -> PatchHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PATCH_DOMAIN);
    hasher.update(parent.as_bytes());
    hasher.update(&canonical_operation_bytes(op));
    PatchHash(*hasher.finalize().as_bytes())
}
