//! In-memory implementation of the PatchStore trait.

use std::collections::HashMap;

use chainpad_core::PatchHash;

use crate::traits::{InsertResult, PatchStore, StoredPatch};

/// In-memory patch store.
///
/// All data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Patches indexed by hash.
    patches: HashMap<PatchHash, StoredPatch>,

    /// Hashes in insertion order.
    order: Vec<PatchHash>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate stored patches in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredPatch> {
        self.order.iter().filter_map(|h| self.patches.get(h))
    }
}

impl PatchStore for MemoryStore {
    fn insert(&mut self, stored: StoredPatch) -> InsertResult {
        let hash = *stored.patch.hash();
        if self.patches.contains_key(&hash) {
            return InsertResult::AlreadyExists;
        }
        self.patches.insert(hash, stored);
        self.order.push(hash);
        InsertResult::Inserted
    }

    fn get(&self, hash: &PatchHash) -> Option<&StoredPatch> {
        self.patches.get(hash)
    }

    fn len(&self) -> usize {
        self.patches.len()
    }
}
