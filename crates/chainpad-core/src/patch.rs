//! Patch: one committed operation, linked to its parent by hash.
//!
//! A patch is immutable. Its hash is computed over the parent hash and the
//! canonical bytes of its operation; a patch decoded from the wire carries a
//! claimed hash that must be checked with [`Patch::verify`] before use.

use serde::{Deserialize, Serialize};

use crate::chain::patch_hash;
use crate::error::{CoreError, Result};
use crate::operation::TextOperation;
use crate::types::PatchHash;

/// A hash-linked operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    operation: TextOperation,
    parent: PatchHash,
    hash: PatchHash,
}

impl Patch {
    /// Create a patch on top of `parent`, computing its hash.
    pub fn new(parent: PatchHash, operation: TextOperation) -> Self {
        let hash = patch_hash(&parent, &operation);
        Self {
            operation,
            parent,
            hash,
        }
    }

    /// Assemble a patch from untrusted parts without checking the hash.
    pub fn from_parts(operation: TextOperation, parent: PatchHash, hash: PatchHash) -> Self {
        Self {
            operation,
            parent,
            hash,
        }
    }

    /// The operation carried by this patch.
    pub fn operation(&self) -> &TextOperation {
        &self.operation
    }

    /// The hash of the patch this one extends.
    pub fn parent(&self) -> &PatchHash {
        &self.parent
    }

    /// The claimed hash of this patch.
    pub fn hash(&self) -> &PatchHash {
        &self.hash
    }

    /// Recompute the hash and compare it to the claimed one.
    pub fn verify(&self) -> Result<()> {
        let computed = patch_hash(&self.parent, &self.operation);
        if computed != self.hash {
            return Err(CoreError::HashMismatch {
                claimed: self.hash,
                computed,
            });
        }
        Ok(())
    }

    /// Take the operation out of the patch.
    pub fn into_operation(self) -> TextOperation {
        self.operation
    }
}
