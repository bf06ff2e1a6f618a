//! Pending queue: local operations not yet committed to the chain.
//!
//! Entries apply in order on top of the authoritative text. An entry may carry
//! an origin: the lineage of an own patch that lost a fork and was rebased
//! back into the queue. Such entries are committed one patch each, so a later
//! switch back to the original branch can recognise and drop them.
//!
//! Entries only ever hold text typed on this peer. Rebasing splits an entry
//! rather than re-insert text another peer wrote, and committing composes
//! only edits that touch, so no patch spans text it did not change.

use chainpad_core::{PatchHash, TextOperation};

use crate::error::Result;

/// A queued local operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOp {
    /// The operation, relative to the text after all earlier entries.
    pub op: TextOperation,
    /// Lineage of the own patch this entry was rebased from.
    pub origin: Option<PatchHash>,
}

impl PendingOp {
    /// A fresh local edit.
    pub fn local(op: TextOperation) -> Self {
        Self { op, origin: None }
    }
}

/// Ordered local operations awaiting `sync`.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    ops: Vec<PendingOp>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: PendingOp) {
        self.ops.push(entry);
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }

    /// Remove and return every entry.
    pub fn take(&mut self) -> Vec<PendingOp> {
        std::mem::take(&mut self.ops)
    }

    /// Apply every entry to `base`.
    pub fn apply_to(&self, base: &str) -> Result<String> {
        let mut doc = base.to_string();
        for entry in &self.ops {
            doc = entry.op.apply(&doc)?;
        }
        Ok(doc)
    }

    /// Fold every entry into a single operation relative to `base`.
    ///
    /// Returns `None` when the net effect is empty.
    pub fn compose(&self, base: &str) -> Result<Option<TextOperation>> {
        let mut acc: Option<TextOperation> = None;
        for entry in &self.ops {
            acc = Some(match acc {
                None => entry.op.clone(),
                Some(prev) => prev.compose(&entry.op, base)?,
            });
        }
        Ok(acc.filter(|op| !op.is_noop()))
    }

    /// Empty the queue into commit batches relative to `base`.
    ///
    /// Runs of fresh edits that touch each other are composed into one
    /// operation. Entries with an origin stay separate. Each batch applies
    /// after the previous one; empty batches are skipped.
    pub fn drain_batches(&mut self, base: &str) -> Result<Vec<PendingOp>> {
        let mut batches = Vec::new();
        let mut doc = base.to_string();
        let mut run: Option<TextOperation> = None;

        for entry in self.take() {
            if entry.origin.is_none() {
                run = match run {
                    Some(prev) if prev.touches(&entry.op) => Some(prev.compose(&entry.op, &doc)?),
                    prev => {
                        close_run(prev, &mut doc, &mut batches)?;
                        Some(entry.op)
                    }
                };
                continue;
            }
            close_run(run.take(), &mut doc, &mut batches)?;
            if !entry.op.is_noop() {
                doc = entry.op.apply(&doc)?;
                batches.push(entry);
            }
        }
        close_run(run, &mut doc, &mut batches)?;
        Ok(batches)
    }

    /// Rebase every entry over `incoming`, an operation on the base text.
    ///
    /// Returns `incoming` rewritten to apply after all entries.
    pub fn rebase_over(&mut self, incoming: &TextOperation) -> TextOperation {
        let mut incoming = incoming.clone();
        let mut rebased = Vec::with_capacity(self.ops.len());
        for entry in self.ops.drain(..) {
            let next = incoming.transform(&entry.op);
            for op in entry.op.transform_parts(&incoming) {
                rebased.push(PendingOp {
                    op,
                    origin: entry.origin,
                });
            }
            incoming = next;
        }
        self.ops = rebased;
        incoming
    }

    /// Move every entry of `other` to the end of this queue.
    pub fn append(&mut self, other: &mut PendingQueue) {
        self.ops.append(&mut other.ops);
    }
}

/// Push a composed run as a batch unless it is empty.
fn close_run(run: Option<TextOperation>, doc: &mut String, batches: &mut Vec<PendingOp>) -> Result<()> {
    if let Some(op) = run.filter(|op| !op.is_noop()) {
        *doc = op.apply(doc)?;
        batches.push(PendingOp::local(op));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(ops: &[TextOperation]) -> PendingQueue {
        let mut queue = PendingQueue::new();
        for op in ops {
            queue.push(PendingOp::local(op.clone()));
        }
        queue
    }

    #[test]
    fn test_compose_matches_apply() {
        let base = "hello";
        let q = queue(&[
            TextOperation::insert(5, " world"),
            TextOperation::remove(0, 1),
            TextOperation::insert(0, "J"),
        ]);
        let op = q.compose(base).unwrap().unwrap();
        assert_eq!(op.apply(base).unwrap(), q.apply_to(base).unwrap());
        assert_eq!(q.apply_to(base).unwrap(), "Jello world");
    }

    #[test]
    fn test_compose_empty_effect() {
        let q = queue(&[TextOperation::insert(0, "x"), TextOperation::remove(0, 1)]);
        assert_eq!(q.compose("").unwrap(), None);
        assert_eq!(PendingQueue::new().compose("abc").unwrap(), None);
    }

    #[test]
    fn test_rebase_over_keeps_document_consistent() {
        let base = "abcdef";
        let mut q = queue(&[TextOperation::insert(3, "XY"), TextOperation::remove(0, 2)]);
        let incoming = TextOperation::new(4, 1, "z");

        let local_doc = q.apply_to(base).unwrap();
        let net = q.rebase_over(&incoming);

        let new_base = incoming.apply(base).unwrap();
        assert_eq!(net.apply(&local_doc).unwrap(), q.apply_to(&new_base).unwrap());
    }

    #[test]
    fn test_drain_batches_keeps_distant_edits_apart() {
        let base = "0123456789";
        let mut q = queue(&[TextOperation::insert(0, "a"), TextOperation::insert(11, "z")]);
        let expected = q.apply_to(base).unwrap();

        let batches = q.drain_batches(base).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].op, TextOperation::insert(0, "a"));
        assert_eq!(batches[1].op, TextOperation::insert(11, "z"));

        let mut doc = base.to_string();
        for batch in &batches {
            doc = batch.op.apply(&doc).unwrap();
        }
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_rebase_never_reinserts_remote_text() {
        let base = "abcdef";
        let mut q = queue(&[TextOperation::remove(1, 4)]);
        let local_doc = q.apply_to(base).unwrap();
        let incoming = TextOperation::insert(3, "REMOTE");

        let net = q.rebase_over(&incoming);
        assert_eq!(q.len(), 2);
        assert!(q.iter().all(|entry| entry.op.to_insert.is_empty()));

        let new_base = incoming.apply(base).unwrap();
        assert_eq!(q.apply_to(&new_base).unwrap(), "aREMOTEf");
        assert_eq!(net.apply(&local_doc).unwrap(), "aREMOTEf");

        let batches = q.drain_batches(&new_base).unwrap();
        assert_eq!(batches.len(), 2, "split removals must not compose over remote text");
    }

    #[test]
    fn test_drain_batches_separates_origins() {
        let base = "";
        let origin = PatchHash::from_bytes([9; 32]);
        let mut q = queue(&[TextOperation::insert(0, "a"), TextOperation::insert(1, "b")]);
        q.push(PendingOp {
            op: TextOperation::insert(2, "c"),
            origin: Some(origin),
        });
        q.push(PendingOp::local(TextOperation::insert(3, "d")));

        let batches = q.drain_batches(base).unwrap();
        assert!(q.is_empty());
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].op, TextOperation::insert(0, "ab"));
        assert_eq!(batches[1].origin, Some(origin));
        assert_eq!(batches[2].op, TextOperation::insert(3, "d"));
    }
}
