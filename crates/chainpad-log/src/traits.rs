//! PatchStore trait: the storage interface behind the operation log.
//!
//! The log owns tree logic (buffering, head selection). A store only keeps
//! validated patches addressable by hash.

use chainpad_core::{Patch, PatchHash};

/// Result of inserting a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Patch was inserted.
    Inserted,
    /// Patch already exists (idempotent, not an error).
    AlreadyExists,
}

/// A validated patch together with its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPatch {
    /// The patch itself.
    pub patch: Patch,
    /// Distance from the root; the first patch after the root has depth 1.
    pub depth: u64,
    /// Document length in characters after applying this patch.
    pub length: usize,
}

/// Storage for validated patches.
///
/// # Design Notes
///
/// - **Idempotent inserts**: inserting the same hash twice returns `AlreadyExists`.
/// - **Never deletes**: a stored patch stays reachable for the lifetime of the store.
pub trait PatchStore {
    /// Insert a validated patch.
    fn insert(&mut self, stored: StoredPatch) -> InsertResult;

    /// Get a patch by hash.
    fn get(&self, hash: &PatchHash) -> Option<&StoredPatch>;

    /// Check if a patch exists.
    fn contains(&self, hash: &PatchHash) -> bool {
        self.get(hash).is_some()
    }

    /// Number of stored patches.
    fn len(&self) -> usize;

    /// True if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
