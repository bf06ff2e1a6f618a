//! OperationLog: an append-only tree of patches rooted at the document root.
//!
//! Patches may arrive in any order. A patch whose parent is unknown waits in a
//! bounded buffer until the parent arrives; every patch stored unblocks its
//! buffered children in breadth-first order.
//!
//! ## Head selection
//!
//! The head is the deepest stored patch. Equal depth is broken by the
//! lexicographically smaller hash. Every replica holding the same set of
//! patches therefore selects the same head, whatever the arrival order.

use std::collections::{HashMap, HashSet, VecDeque};

use chainpad_core::{root_hash, CoreError, Patch, PatchHash};

use crate::error::{LogError, Result};
use crate::memory::MemoryStore;
use crate::traits::{PatchStore, StoredPatch};

/// Configuration for the log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum number of patches held while waiting for their parents.
    pub max_buffered_patches: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_buffered_patches: 1024,
        }
    }
}

/// How the head moved as a result of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadChange {
    /// The head did not move.
    Unchanged,
    /// The head moved forward along the same branch.
    Extended {
        /// Patches from the old head (exclusive) to the new head, in order.
        applied: Vec<Patch>,
    },
    /// The head switched to another branch.
    Reorganized {
        /// Last patch shared by both branches.
        ancestor: PatchHash,
        /// Patches from the ancestor (exclusive) to the old head, in order.
        reverted: Vec<Patch>,
        /// Patches from the ancestor (exclusive) to the new head, in order.
        applied: Vec<Patch>,
    },
}

/// Details of an append that stored at least one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// Hashes newly stored, the appended patch first, then drained descendants.
    pub stored: Vec<PatchHash>,
    /// Head movement.
    pub head: HeadChange,
}

/// Result of appending a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// The patch is already stored or buffered.
    Duplicate,
    /// The parent is unknown; the patch waits in the buffer.
    Buffered,
    /// The patch was stored.
    Accepted(Accepted),
}

/// Append-only patch tree for a single channel.
pub struct OperationLog<S: PatchStore = MemoryStore> {
    /// Hash of the empty history.
    root: PatchHash,
    /// Content at the root.
    initial: String,
    /// Character length of `initial`.
    initial_len: usize,
    /// Validated patches.
    store: S,
    /// Current best tip.
    head: PatchHash,
    /// Depth of `head`.
    head_depth: u64,
    /// Patches waiting for their parent, keyed by parent hash.
    buffered: HashMap<PatchHash, Vec<Patch>>,
    /// Hashes of every buffered patch.
    buffered_hashes: HashSet<PatchHash>,
    config: LogConfig,
}

impl OperationLog<MemoryStore> {
    /// Create an in-memory log for `channel` starting from `initial`.
    pub fn new(channel: &str, initial: &str) -> Self {
        Self::with_store(channel, initial, LogConfig::default(), MemoryStore::new())
    }

    /// Create an in-memory log with the given configuration.
    pub fn with_config(channel: &str, initial: &str, config: LogConfig) -> Self {
        Self::with_store(channel, initial, config, MemoryStore::new())
    }
}

impl<S: PatchStore> OperationLog<S> {
    /// Create a log backed by `store`.
    pub fn with_store(channel: &str, initial: &str, config: LogConfig, store: S) -> Self {
        let root = root_hash(channel, initial);
        Self {
            root,
            initial: initial.to_string(),
            initial_len: initial.chars().count(),
            store,
            head: root,
            head_depth: 0,
            buffered: HashMap::new(),
            buffered_hashes: HashSet::new(),
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Hash of the empty history.
    pub fn root(&self) -> PatchHash {
        self.root
    }

    /// Content at the root.
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Hash of the current best tip (the root while empty).
    pub fn head(&self) -> PatchHash {
        self.head
    }

    /// Depth of the current head.
    pub fn head_depth(&self) -> u64 {
        self.head_depth
    }

    /// Number of stored patches.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if no patch is stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of patches waiting for their parents.
    pub fn buffered_len(&self) -> usize {
        self.buffered_hashes.len()
    }

    /// True if `hash` is the root or a stored patch.
    pub fn contains(&self, hash: &PatchHash) -> bool {
        *hash == self.root || self.store.contains(hash)
    }

    /// True if `hash` is stored or waiting in the buffer.
    pub fn knows(&self, hash: &PatchHash) -> bool {
        self.contains(hash) || self.buffered_hashes.contains(hash)
    }

    /// Get a stored patch.
    pub fn get(&self, hash: &PatchHash) -> Option<&Patch> {
        self.store.get(hash).map(|s| &s.patch)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Append
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a patch received from anywhere.
    ///
    /// Verification failures leave the log untouched. A buffered descendant
    /// that turns out to be invalid when its parent arrives is discarded.
    pub fn append(&mut self, patch: Patch) -> Result<AppendResult> {
        patch.verify().map_err(|e| match e {
            CoreError::HashMismatch { claimed, computed } => {
                LogError::Integrity { claimed, computed }
            }
            other => LogError::Core(other),
        })?;

        let hash = *patch.hash();
        if self.knows(&hash) {
            tracing::trace!(%hash, "duplicate patch");
            return Ok(AppendResult::Duplicate);
        }

        let parent = *patch.parent();
        if !self.contains(&parent) {
            if self.buffered_hashes.len() >= self.config.max_buffered_patches {
                return Err(LogError::BufferFull {
                    limit: self.config.max_buffered_patches,
                });
            }
            tracing::debug!(%hash, %parent, "buffering patch with unknown parent");
            self.buffered_hashes.insert(hash);
            self.buffered.entry(parent).or_default().push(patch);
            return Ok(AppendResult::Buffered);
        }

        let old_head = self.head;
        self.store_patch(patch)?;
        let mut stored = vec![hash];

        let mut queue = VecDeque::from([hash]);
        while let Some(parent) = queue.pop_front() {
            let Some(children) = self.buffered.remove(&parent) else {
                continue;
            };
            for child in children {
                let child_hash = *child.hash();
                self.buffered_hashes.remove(&child_hash);
                match self.store_patch(child) {
                    Ok(()) => {
                        stored.push(child_hash);
                        queue.push_back(child_hash);
                    }
                    Err(e) => {
                        tracing::warn!(hash = %child_hash, error = %e, "discarding buffered patch");
                    }
                }
            }
        }

        let head = self.head_change(old_head)?;
        Ok(AppendResult::Accepted(Accepted { stored, head }))
    }

    /// Validate a patch whose parent is known, store it and update the head.
    fn store_patch(&mut self, patch: Patch) -> Result<()> {
        let (parent_depth, parent_len) = self.position(patch.parent())?;
        let op = patch.operation();
        if op.check(parent_len).is_err() {
            return Err(LogError::OutOfRange {
                hash: *patch.hash(),
                offset: op.offset,
                to_remove: op.to_remove,
                len: parent_len,
            });
        }

        let hash = *patch.hash();
        let depth = parent_depth + 1;
        let length = op.resulting_len(parent_len);
        self.store.insert(StoredPatch {
            patch,
            depth,
            length,
        });

        if depth > self.head_depth || (depth == self.head_depth && hash < self.head) {
            self.head = hash;
            self.head_depth = depth;
        }
        Ok(())
    }

    fn head_change(&self, old_head: PatchHash) -> Result<HeadChange> {
        if self.head == old_head {
            return Ok(HeadChange::Unchanged);
        }
        let ancestor = self.common_ancestor(&old_head, &self.head)?;
        if ancestor == old_head {
            return Ok(HeadChange::Extended {
                applied: self.path(&ancestor, &self.head)?,
            });
        }
        tracing::debug!(%old_head, new_head = %self.head, %ancestor, "head switched branch");
        Ok(HeadChange::Reorganized {
            ancestor,
            reverted: self.path(&ancestor, &old_head)?,
            applied: self.path(&ancestor, &self.head)?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Traversal
    // ─────────────────────────────────────────────────────────────────────────

    /// Depth and document length at `hash`.
    fn position(&self, hash: &PatchHash) -> Result<(u64, usize)> {
        if *hash == self.root {
            return Ok((0, self.initial_len));
        }
        self.store
            .get(hash)
            .map(|s| (s.depth, s.length))
            .ok_or(LogError::UnknownPatch(*hash))
    }

    fn parent_of(&self, hash: &PatchHash) -> Result<PatchHash> {
        self.store
            .get(hash)
            .map(|s| *s.patch.parent())
            .ok_or(LogError::UnknownPatch(*hash))
    }

    /// Last patch shared by the histories of `a` and `b`.
    pub fn common_ancestor(&self, a: &PatchHash, b: &PatchHash) -> Result<PatchHash> {
        let (mut a, mut b) = (*a, *b);
        let (mut depth_a, _) = self.position(&a)?;
        let (mut depth_b, _) = self.position(&b)?;

        while depth_a > depth_b {
            a = self.parent_of(&a)?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent_of(&b)?;
            depth_b -= 1;
        }
        while a != b {
            a = self.parent_of(&a)?;
            b = self.parent_of(&b)?;
        }
        Ok(a)
    }

    /// Patches from `ancestor` (exclusive) to `tip` (inclusive), in order.
    pub fn path(&self, ancestor: &PatchHash, tip: &PatchHash) -> Result<Vec<Patch>> {
        let mut patches = Vec::new();
        let mut cursor = *tip;
        while cursor != *ancestor {
            if cursor == self.root {
                return Err(LogError::UnknownPatch(*ancestor));
            }
            let stored = self.store.get(&cursor).ok_or(LogError::UnknownPatch(cursor))?;
            patches.push(stored.patch.clone());
            cursor = *stored.patch.parent();
        }
        patches.reverse();
        Ok(patches)
    }

    /// The best chain: every patch from the root to the head.
    pub fn chain(&self) -> Result<Vec<Patch>> {
        self.path(&self.root, &self.head)
    }

    /// Document content after replaying history up to `hash`.
    pub fn content_at(&self, hash: &PatchHash) -> Result<String> {
        let mut doc = self.initial.clone();
        for patch in self.path(&self.root, hash)? {
            doc = patch.operation().apply(&doc)?;
        }
        Ok(doc)
    }

    /// Document content at the head.
    pub fn content(&self) -> Result<String> {
        self.content_at(&self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpad_core::TextOperation;

    fn accepted(result: AppendResult) -> Accepted {
        match result {
            AppendResult::Accepted(accepted) => accepted,
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_linear_append_extends() {
        let mut log = OperationLog::new("chan", "");
        let p1 = Patch::new(log.root(), TextOperation::insert(0, "ab"));
        let p2 = Patch::new(*p1.hash(), TextOperation::insert(2, "c"));

        let first = accepted(log.append(p1.clone()).unwrap());
        assert_eq!(
            first.head,
            HeadChange::Extended {
                applied: vec![p1.clone()]
            }
        );
        accepted(log.append(p2.clone()).unwrap());

        assert_eq!(log.head(), *p2.hash());
        assert_eq!(log.head_depth(), 2);
        assert_eq!(log.content().unwrap(), "abc");
        assert_eq!(log.chain().unwrap(), vec![p1, p2]);
    }

    #[test]
    fn test_append_idempotent() {
        let mut log = OperationLog::new("chan", "x");
        let p1 = Patch::new(log.root(), TextOperation::insert(1, "y"));
        log.append(p1.clone()).unwrap();
        assert_eq!(log.append(p1).unwrap(), AppendResult::Duplicate);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_integrity_failure_leaves_log_untouched() {
        let mut log = OperationLog::new("chan", "");
        let good = Patch::new(log.root(), TextOperation::insert(0, "a"));
        let bad = Patch::from_parts(TextOperation::insert(0, "b"), log.root(), *good.hash());
        assert!(matches!(log.append(bad), Err(LogError::Integrity { .. })));
        assert!(log.is_empty());
        assert_eq!(log.head(), log.root());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut log = OperationLog::new("chan", "");
        let patch = Patch::new(log.root(), TextOperation::insert(3, "d"));
        assert!(matches!(
            log.append(patch),
            Err(LogError::OutOfRange { len: 0, .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn test_out_of_order_drains_breadth_first() {
        let mut log = OperationLog::new("chan", "");
        let p1 = Patch::new(log.root(), TextOperation::insert(0, "a"));
        let p2 = Patch::new(*p1.hash(), TextOperation::insert(1, "b"));
        let p3 = Patch::new(*p2.hash(), TextOperation::insert(2, "c"));

        assert_eq!(log.append(p3.clone()).unwrap(), AppendResult::Buffered);
        assert_eq!(log.append(p2.clone()).unwrap(), AppendResult::Buffered);
        assert_eq!(log.append(p3.clone()).unwrap(), AppendResult::Duplicate);
        assert_eq!(log.buffered_len(), 2);

        let result = accepted(log.append(p1.clone()).unwrap());
        assert_eq!(result.stored, vec![*p1.hash(), *p2.hash(), *p3.hash()]);
        assert_eq!(
            result.head,
            HeadChange::Extended {
                applied: vec![p1, p2, p3]
            }
        );
        assert_eq!(log.buffered_len(), 0);
        assert_eq!(log.content().unwrap(), "abc");
    }

    #[test]
    fn test_invalid_buffered_child_discarded() {
        let mut log = OperationLog::new("chan", "");
        let p1 = Patch::new(log.root(), TextOperation::insert(0, "a"));
        let bad = Patch::new(*p1.hash(), TextOperation::remove(0, 5));
        assert_eq!(log.append(bad.clone()).unwrap(), AppendResult::Buffered);

        let result = accepted(log.append(p1.clone()).unwrap());
        assert_eq!(result.stored, vec![*p1.hash()]);
        assert!(!log.knows(bad.hash()));
    }

    #[test]
    fn test_buffer_full() {
        let config = LogConfig {
            max_buffered_patches: 1,
        };
        let mut log = OperationLog::with_config("chan", "", config);
        let orphan = |text: &str| Patch::new(PatchHash::from_bytes([7; 32]), TextOperation::insert(0, text));
        assert_eq!(log.append(orphan("a")).unwrap(), AppendResult::Buffered);
        assert_eq!(
            log.append(orphan("b")),
            Err(LogError::BufferFull { limit: 1 })
        );
    }

    #[test]
    fn test_fork_prefers_depth_then_lower_hash() {
        let mut log = OperationLog::new("chan", "");
        let a = Patch::new(log.root(), TextOperation::insert(0, "a"));
        let b = Patch::new(log.root(), TextOperation::insert(0, "b"));
        log.append(a.clone()).unwrap();
        log.append(b.clone()).unwrap();

        let lower = std::cmp::min(*a.hash(), *b.hash());
        assert_eq!(log.head(), lower);

        // Extending the losing branch makes it the deeper one.
        let (winner, loser) = if lower == *a.hash() { (a, b) } else { (b, a) };
        let ext = Patch::new(*loser.hash(), TextOperation::insert(1, "z"));
        let result = accepted(log.append(ext.clone()).unwrap());
        assert_eq!(
            result.head,
            HeadChange::Reorganized {
                ancestor: log.root(),
                reverted: vec![winner],
                applied: vec![loser, ext.clone()],
            }
        );
        assert_eq!(log.head(), *ext.hash());
    }

    #[test]
    fn test_head_independent_of_arrival_order() {
        let root = root_hash("chan", "base");
        let a = Patch::new(root, TextOperation::insert(0, "x"));
        let b = Patch::new(root, TextOperation::remove(1, 2));
        let c = Patch::new(*b.hash(), TextOperation::insert(0, "y"));
        let d = Patch::new(*a.hash(), TextOperation::insert(5, "w"));
        let patches = [a, b, c, d];

        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
        let mut heads = Vec::new();
        for order in orders {
            let mut log = OperationLog::new("chan", "base");
            for i in order {
                log.append(patches[i].clone()).unwrap();
            }
            heads.push((log.head(), log.content().unwrap()));
        }
        assert!(heads.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_common_ancestor_and_path() {
        let mut log = OperationLog::new("chan", "");
        let p1 = Patch::new(log.root(), TextOperation::insert(0, "a"));
        let left = Patch::new(*p1.hash(), TextOperation::insert(1, "l"));
        let right = Patch::new(*p1.hash(), TextOperation::insert(0, "r"));
        for p in [&p1, &left, &right] {
            log.append(p.clone()).unwrap();
        }
        assert_eq!(log.common_ancestor(left.hash(), right.hash()).unwrap(), *p1.hash());
        assert_eq!(log.path(p1.hash(), left.hash()).unwrap(), vec![left.clone()]);
        assert!(log.path(right.hash(), left.hash()).is_err());
        assert_eq!(log.content_at(right.hash()).unwrap(), "ra");
        assert_eq!(log.content_at(&log.root()).unwrap(), "");
    }
}
