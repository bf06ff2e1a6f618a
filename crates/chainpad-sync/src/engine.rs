//! SyncEngine: one peer's view of a shared document.
//!
//! The engine holds three texts:
//!
//! - the **authoritative** text: the content at the head of the log,
//! - the **pending** queue: local operations not yet committed,
//! - the **document**: authoritative text with the pending queue applied.
//!
//! Local edits change the document and join the queue. `sync()` commits the
//! queue as patches on the head. Remote patches extend or reorganize the log;
//! the queue is rebased over them so the document keeps every local edit.
//!
//! ## Reentrancy
//!
//! All state lives behind one `RefCell` that is never borrowed while a handler
//! runs. State changes queue effects (outbound frames, notifications) that a
//! single non-nested dispatch loop drains afterwards. A handler may therefore
//! call back into any engine, including `abort()`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use chainpad_core::text::char_len;
use chainpad_core::{Patch, PatchHash, TextOperation};
use chainpad_log::{AppendResult, HeadChange, LogConfig, LogError, OperationLog};

use crate::error::{Result, SyncError};
use crate::handlers::{EventKind, Handlers, InsertHandler, MessageHandler, RemoveHandler};
use crate::messages::{ChannelId, Frame, Message, PeerId};
use crate::pending::{PendingOp, PendingQueue};

/// What to do with a local edit whose offset is past the end of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// Return `OutOfRange` and leave the engine untouched.
    #[default]
    Reject,
    /// Move the offset to the end of the document.
    Clamp,
}

/// Configuration for an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Handling of out-of-range local offsets.
    pub range_policy: RangePolicy,
    /// Notify insert/remove handlers about local edits too. Hosts that
    /// already mirror their own edits turn this off.
    pub notify_local_edits: bool,
    /// Re-emit every newly stored foreign patch once.
    pub rebroadcast: bool,
    /// Maximum number of patches waiting for their parents.
    pub max_buffered_patches: usize,
    /// Panic when a transformed operation falls outside the document.
    pub strict_transforms: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            range_policy: RangePolicy::Reject,
            notify_local_edits: true,
            rebroadcast: true,
            max_buffered_patches: LogConfig::default().max_buffered_patches,
            strict_transforms: cfg!(debug_assertions),
        }
    }
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Allocated; nothing has been sent.
    Created,
    /// Handshake sent.
    Started,
    /// Terminal.
    Aborted,
}

/// Outcome of handling one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Valid but irrelevant here (own echo, repeated ack, not started).
    Ignored,
    /// Another peer joined; answered with an ack and the chain.
    Handshake { replayed: usize },
    /// Our own handshake completed; history was requested.
    Registered,
    /// Answered a history request with the chain.
    HistorySent { replayed: usize },
    /// The patch was already known.
    Duplicate,
    /// The patch waits for its parent.
    Buffered,
    /// Patches were stored.
    Applied { stored: usize },
}

/// Side effects produced while the state is borrowed, dispatched afterwards.
#[derive(Debug)]
enum Effect {
    Outbound(Bytes),
    Inserted { offset: usize, text: String },
    Removed { offset: usize, count: usize },
}

/// Push the notifications describing `op`: removal first, then insertion.
fn notify(op: &TextOperation, effects: &mut Vec<Effect>) {
    if op.to_remove > 0 {
        effects.push(Effect::Removed {
            offset: op.offset,
            count: op.to_remove,
        });
    }
    if !op.to_insert.is_empty() {
        effects.push(Effect::Inserted {
            offset: op.offset,
            text: op.to_insert.clone(),
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Peer state
// ─────────────────────────────────────────────────────────────────────────────

struct PeerState {
    config: EngineConfig,
    peer: PeerId,
    channel: ChannelId,
    key: String,
    phase: Phase,
    registered: bool,
    log: OperationLog,
    authoritative: String,
    document: String,
    pending: PendingQueue,
    /// Own patches, mapped to the first patch of their rebase lineage.
    lineage: HashMap<PatchHash, PatchHash>,
    /// Patches this engine has emitted.
    announced: HashSet<PatchHash>,
    /// A history request is outstanding until the log has no gaps.
    awaiting_history: bool,
}

impl PeerState {
    fn new(peer: PeerId, channel: ChannelId, key: String, initial: &str, config: EngineConfig) -> Self {
        let log_config = LogConfig {
            max_buffered_patches: config.max_buffered_patches,
        };
        Self {
            log: OperationLog::with_config(channel.as_str(), initial, log_config),
            config,
            peer,
            channel,
            key,
            phase: Phase::Created,
            registered: false,
            authoritative: initial.to_string(),
            document: initial.to_string(),
            pending: PendingQueue::new(),
            lineage: HashMap::new(),
            announced: HashSet::new(),
            awaiting_history: false,
        }
    }

    fn emit(&self, message: Message, effects: &mut Vec<Effect>) -> Result<()> {
        let frame = Frame {
            channel: Some(self.channel.clone()),
            peer: self.peer.clone(),
            key: self.key.clone(),
            message,
        };
        effects.push(Effect::Outbound(frame.encode()?));
        Ok(())
    }

    fn emit_chain(&self, effects: &mut Vec<Effect>) -> Result<usize> {
        let chain = self.log.chain()?;
        let count = chain.len();
        for patch in chain {
            self.emit(Message::Patch(patch), effects)?;
        }
        Ok(count)
    }

    fn lineage_of(&self, hash: &PatchHash) -> PatchHash {
        self.lineage.get(hash).copied().unwrap_or(*hash)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local edits
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_offset(&self, offset: usize) -> Result<usize> {
        let len = char_len(&self.document);
        if offset <= len {
            return Ok(offset);
        }
        match self.config.range_policy {
            RangePolicy::Reject => Err(SyncError::OutOfRange {
                offset,
                to_remove: 0,
                len,
            }),
            RangePolicy::Clamp => Ok(len),
        }
    }

    fn insert(&mut self, offset: usize, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        let offset = self.resolve_offset(offset)?;
        if text.is_empty() {
            return Ok(());
        }
        self.edit(TextOperation::insert(offset, text), effects)
    }

    fn remove(&mut self, offset: usize, count: usize, effects: &mut Vec<Effect>) -> Result<()> {
        let offset = self.resolve_offset(offset)?;
        let count = count.min(char_len(&self.document) - offset);
        if count == 0 {
            return Ok(());
        }
        self.edit(TextOperation::remove(offset, count), effects)
    }

    fn edit(&mut self, op: TextOperation, effects: &mut Vec<Effect>) -> Result<()> {
        self.document = op.apply(&self.document)?;
        if self.config.notify_local_edits {
            notify(&op, effects);
        }
        self.pending.push(PendingOp::local(op));
        Ok(())
    }

    fn commit(&mut self, effects: &mut Vec<Effect>) -> Result<usize> {
        if self.phase != Phase::Started || !self.registered || self.pending.is_empty() {
            return Ok(0);
        }

        let mut emitted = 0;
        for batch in self.pending.drain_batches(&self.authoritative)? {
            let patch = Patch::new(self.log.head(), batch.op);
            let hash = *patch.hash();
            match self.log.append(patch.clone())? {
                AppendResult::Accepted(_) => {}
                other => {
                    return Err(SyncError::Protocol(format!(
                        "local patch {} not accepted: {:?}",
                        hash, other
                    )))
                }
            }
            self.authoritative = patch.operation().apply(&self.authoritative)?;
            self.lineage.insert(hash, batch.origin.unwrap_or(hash));
            self.announced.insert(hash);
            tracing::debug!(peer = %self.peer, %hash, depth = self.log.head_depth(), "committed local patch");
            self.emit(Message::Patch(patch), effects)?;
            emitted += 1;
        }
        Ok(emitted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    fn receive(&mut self, raw: &[u8], effects: &mut Vec<Effect>) -> Result<Delivery> {
        let frame = Frame::decode(raw)?;
        if let Some(channel) = &frame.channel {
            if *channel != self.channel {
                return Err(SyncError::Protocol(format!("frame for channel {}", channel)));
            }
        }
        if frame.key != self.key {
            return Err(SyncError::Protocol("validation key mismatch".into()));
        }
        tracing::trace!(
            peer = %self.peer,
            from = %frame.peer,
            kind = frame.message.kind(),
            "received frame"
        );

        match frame.message {
            Message::Register => {
                if frame.peer == self.peer || self.phase != Phase::Started {
                    return Ok(Delivery::Ignored);
                }
                self.emit(Message::RegisterAck, effects)?;
                let replayed = self.emit_chain(effects)?;
                tracing::debug!(peer = %self.peer, joined = %frame.peer, replayed, "answered handshake");
                Ok(Delivery::Handshake { replayed })
            }
            Message::RegisterAck => {
                if self.phase != Phase::Started {
                    return Err(SyncError::Protocol("acknowledgement before start".into()));
                }
                if self.registered {
                    return Ok(Delivery::Ignored);
                }
                self.registered = true;
                tracing::debug!(peer = %self.peer, channel = %self.channel, "handshake complete");
                // Patches replayed to us before the ack were dropped.
                self.emit(Message::HistoryRequest, effects)?;
                Ok(Delivery::Registered)
            }
            Message::HistoryRequest => {
                if frame.peer == self.peer || self.phase != Phase::Started {
                    return Ok(Delivery::Ignored);
                }
                let replayed = self.emit_chain(effects)?;
                Ok(Delivery::HistorySent { replayed })
            }
            Message::Patch(patch) => {
                if !self.registered {
                    return Err(SyncError::Protocol("patch before handshake completed".into()));
                }
                self.receive_patch(patch, effects)
            }
        }
    }

    fn receive_patch(&mut self, patch: Patch, effects: &mut Vec<Effect>) -> Result<Delivery> {
        let hash = *patch.hash();
        let result = match self.log.append(patch) {
            Ok(result) => result,
            Err(err @ LogError::Integrity { .. }) => {
                tracing::warn!(peer = %self.peer, %hash, "patch failed verification");
                if !self.awaiting_history {
                    self.awaiting_history = true;
                    self.emit(Message::HistoryRequest, effects)?;
                }
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(peer = %self.peer, %hash, error = %err, "rejected patch");
                return Err(err.into());
            }
        };

        let accepted = match result {
            AppendResult::Duplicate => return Ok(Delivery::Duplicate),
            AppendResult::Buffered => {
                if !self.awaiting_history {
                    self.awaiting_history = true;
                    tracing::debug!(peer = %self.peer, %hash, "parent unknown, requesting history");
                    self.emit(Message::HistoryRequest, effects)?;
                }
                return Ok(Delivery::Buffered);
            }
            AppendResult::Accepted(accepted) => accepted,
        };
        if self.log.buffered_len() == 0 {
            self.awaiting_history = false;
        }

        match accepted.head {
            HeadChange::Unchanged => {}
            HeadChange::Extended { applied } => self.fast_forward(applied, effects)?,
            HeadChange::Reorganized {
                ancestor,
                reverted,
                applied,
            } => self.reorganize(ancestor, reverted, applied, effects)?,
        }

        if self.config.rebroadcast {
            for stored in &accepted.stored {
                if !self.announced.insert(*stored) {
                    continue;
                }
                if let Some(patch) = self.log.get(stored) {
                    self.emit(Message::Patch(patch.clone()), effects)?;
                }
            }
        }

        Ok(Delivery::Applied {
            stored: accepted.stored.len(),
        })
    }

    /// The head moved forward: fold each patch into the authoritative text and
    /// rebase the queue over it.
    fn fast_forward(&mut self, applied: Vec<Patch>, effects: &mut Vec<Effect>) -> Result<()> {
        let Some(old_head) = applied.first().map(|p| *p.parent()) else {
            return Ok(());
        };
        let lineages: HashSet<PatchHash> = applied.iter().map(|p| self.lineage_of(p.hash())).collect();
        let superseded = self
            .pending
            .iter()
            .any(|entry| entry.origin.map_or(false, |o| lineages.contains(&o)));
        if superseded {
            return self.reorganize(old_head, Vec::new(), applied, effects);
        }

        for patch in &applied {
            let op = patch.operation();
            self.authoritative = op.apply(&self.authoritative)?;
            let net = self.pending.rebase_over(op);
            self.apply_remote(net, effects)?;
        }
        Ok(())
    }

    fn apply_remote(&mut self, net: TextOperation, effects: &mut Vec<Effect>) -> Result<()> {
        if let Err(err) = net.check(char_len(&self.document)) {
            if self.config.strict_transforms {
                panic!("transformed operation out of range: {}", err);
            }
            tracing::error!(peer = %self.peer, error = %err, "transformed operation out of range");
            return self.rebuild_document(effects);
        }
        if net.is_noop() {
            return Ok(());
        }
        self.document = net.apply(&self.document)?;
        notify(&net, effects);
        Ok(())
    }

    /// The head switched branch.
    ///
    /// Own patches on the losing branch and the pending queue are replayed on
    /// top of the ancestor, minus anything already present on the winning
    /// branch, then rebased over the winning branch.
    fn reorganize(
        &mut self,
        ancestor: PatchHash,
        reverted: Vec<Patch>,
        applied: Vec<Patch>,
        effects: &mut Vec<Effect>,
    ) -> Result<()> {
        let applied_lineages: HashSet<PatchHash> =
            applied.iter().map(|p| self.lineage_of(p.hash())).collect();

        let reverted_count = reverted.len();
        let mut sequence = Vec::with_capacity(reverted_count + self.pending.len());
        for patch in reverted {
            let origin = self.lineage.get(patch.hash()).copied();
            let keep = origin.map_or(false, |o| !applied_lineages.contains(&o));
            sequence.push((patch.into_operation(), origin, keep));
        }
        for entry in self.pending.take() {
            let keep = entry.origin.map_or(true, |o| !applied_lineages.contains(&o));
            sequence.push((entry.op, entry.origin, keep));
        }

        // `bridge` turns the full replay back into the replay of kept entries.
        let base = self.log.content_at(&ancestor)?;
        let mut full = base.clone();
        let mut bridge: Vec<TextOperation> = Vec::new();
        let mut kept = PendingQueue::new();
        for (op, origin, keep) in sequence {
            if keep {
                let mut rebased = PendingQueue::new();
                rebased.push(PendingOp {
                    op: op.clone(),
                    origin,
                });
                for step in bridge.iter_mut() {
                    *step = rebased.rebase_over(step);
                }
                kept.append(&mut rebased);
            } else {
                bridge.insert(0, op.invert(&full)?);
            }
            full = op.apply(&full)?;
        }

        let mut authoritative = base;
        for patch in &applied {
            authoritative = patch.operation().apply(&authoritative)?;
            kept.rebase_over(patch.operation());
        }

        tracing::debug!(
            peer = %self.peer,
            %ancestor,
            reverted = reverted_count,
            applied = applied.len(),
            kept = kept.len(),
            "rebased onto new branch"
        );
        self.authoritative = authoritative;
        self.pending = kept;
        self.rebuild_document(effects)
    }

    /// Recompute the document from the authoritative text and the queue, and
    /// notify the net change.
    fn rebuild_document(&mut self, effects: &mut Vec<Effect>) -> Result<()> {
        let document = match self.pending.apply_to(&self.authoritative) {
            Ok(document) => document,
            Err(err) => {
                if self.config.strict_transforms {
                    panic!("rebased pending queue does not apply: {}", err);
                }
                tracing::error!(peer = %self.peer, error = %err, "discarding pending queue");
                self.pending.clear();
                self.authoritative.clone()
            }
        };
        let change = TextOperation::diff(&self.document, &document);
        self.document = document;
        notify(&change, effects);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine handle
// ─────────────────────────────────────────────────────────────────────────────

struct EngineInner {
    state: RefCell<PeerState>,
    handlers: RefCell<Handlers>,
    effects: RefCell<VecDeque<Effect>>,
    dispatching: Cell<bool>,
    aborted: Cell<bool>,
}

/// Resets the dispatch flag when the loop exits, including by unwinding.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a peer-side sync engine.
///
/// Cloning the handle shares the engine. The handle is `!Send`: an engine
/// lives on one thread and never blocks.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Rc<EngineInner>,
}

impl SyncEngine {
    /// Create an engine with the default configuration.
    ///
    /// Nothing is sent until [`start`](Self::start).
    pub fn new(
        peer: impl Into<PeerId>,
        channel: impl Into<ChannelId>,
        key: impl Into<String>,
        initial: &str,
    ) -> Self {
        Self::with_config(peer, channel, key, initial, EngineConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(
        peer: impl Into<PeerId>,
        channel: impl Into<ChannelId>,
        key: impl Into<String>,
        initial: &str,
        config: EngineConfig,
    ) -> Self {
        let state = PeerState::new(peer.into(), channel.into(), key.into(), initial, config);
        Self {
            inner: Rc::new(EngineInner {
                state: RefCell::new(state),
                handlers: RefCell::new(Handlers::default()),
                effects: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                aborted: Cell::new(false),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn peer(&self) -> PeerId {
        self.inner.state.borrow().peer.clone()
    }

    pub fn channel(&self) -> ChannelId {
        self.inner.state.borrow().channel.clone()
    }

    pub fn phase(&self) -> Phase {
        if self.inner.aborted.get() {
            return Phase::Aborted;
        }
        self.inner.state.borrow().phase
    }

    /// True once the handshake was acknowledged.
    pub fn is_registered(&self) -> bool {
        self.inner.state.borrow().registered
    }

    /// The local view: authoritative text plus pending edits.
    pub fn document(&self) -> String {
        self.inner.state.borrow().document.clone()
    }

    /// Content at the head of the chain.
    pub fn authoritative(&self) -> String {
        self.inner.state.borrow().authoritative.clone()
    }

    /// Hash of the head of the chain.
    pub fn head(&self) -> PatchHash {
        self.inner.state.borrow().log.head()
    }

    /// Depth of the head of the chain.
    pub fn head_depth(&self) -> u64 {
        self.inner.state.borrow().log.head_depth()
    }

    /// Number of uncommitted local operations.
    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    /// Patches from the root to the head.
    pub fn chain(&self) -> Result<Vec<Patch>> {
        Ok(self.inner.state.borrow().log.chain()?)
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.handlers.borrow().count(kind)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handlers
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a handler for outbound frames.
    pub fn on_message(&self, handler: impl FnMut(&[u8]) + 'static) {
        if self.inner.aborted.get() {
            return;
        }
        let handler: MessageHandler = Rc::new(RefCell::new(handler));
        self.inner.handlers.borrow_mut().add_message(handler);
    }

    /// Register a handler for text inserted into the document.
    pub fn on_insert(&self, handler: impl FnMut(usize, &str) + 'static) {
        if self.inner.aborted.get() {
            return;
        }
        let handler: InsertHandler = Rc::new(RefCell::new(handler));
        self.inner.handlers.borrow_mut().add_insert(handler);
    }

    /// Register a handler for text removed from the document.
    pub fn on_remove(&self, handler: impl FnMut(usize, usize) + 'static) {
        if self.inner.aborted.get() {
            return;
        }
        let handler: RemoveHandler = Rc::new(RefCell::new(handler));
        self.inner.handlers.borrow_mut().add_remove(handler);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Send the handshake. Starting twice is a no-op.
    pub fn start(&self) -> Result<()> {
        self.update(|state, effects| {
            if state.phase == Phase::Started {
                return Ok(());
            }
            state.phase = Phase::Started;
            tracing::debug!(peer = %state.peer, channel = %state.channel, "starting");
            state.emit(Message::Register, effects)
        })
    }

    /// Insert `text` at `offset` in the local document.
    pub fn insert(&self, offset: usize, text: &str) -> Result<()> {
        self.update(|state, effects| state.insert(offset, text, effects))
    }

    /// Remove up to `count` characters at `offset` in the local document.
    pub fn remove(&self, offset: usize, count: usize) -> Result<()> {
        self.update(|state, effects| state.remove(offset, count, effects))
    }

    /// Commit pending edits; returns the number of patches emitted.
    pub fn sync(&self) -> Result<usize> {
        self.update(|state, effects| state.commit(effects))
    }

    /// Handle one inbound frame.
    ///
    /// Malformed or unexpected frames are rejected without touching the engine.
    pub fn message(&self, raw: &[u8]) -> Result<Delivery> {
        let result = self.update(|state, effects| state.receive(raw, effects));
        if let Err(err) = &result {
            tracing::debug!(error = %err, "dropped inbound frame");
        }
        result
    }

    /// Stop the engine. Idempotent and safe to call from any handler.
    pub fn abort(&self) {
        if self.inner.aborted.replace(true) {
            return;
        }
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.phase = Phase::Aborted;
            state.pending.clear();
            tracing::debug!(peer = %state.peer, "aborted");
        }
        if let Ok(mut handlers) = self.inner.handlers.try_borrow_mut() {
            handlers.clear();
        }
        if let Ok(mut effects) = self.inner.effects.try_borrow_mut() {
            effects.clear();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    fn update<T>(&self, f: impl FnOnce(&mut PeerState, &mut Vec<Effect>) -> Result<T>) -> Result<T> {
        if self.inner.aborted.get() {
            return Err(SyncError::Aborted);
        }
        let mut effects = Vec::new();
        let result = {
            let mut state = self.inner.state.borrow_mut();
            f(&mut state, &mut effects)
        };
        self.inner.effects.borrow_mut().extend(effects);
        self.flush();
        result
    }

    fn flush(&self) {
        if self.inner.dispatching.replace(true) {
            return;
        }
        let _guard = DispatchGuard(&self.inner.dispatching);

        while !self.inner.aborted.get() {
            let next = self.inner.effects.borrow_mut().pop_front();
            let Some(effect) = next else {
                break;
            };
            match effect {
                Effect::Outbound(frame) => {
                    let handlers = self.inner.handlers.borrow().message_handlers();
                    for handler in handlers {
                        if self.inner.aborted.get() {
                            break;
                        }
                        if let Ok(mut handler) = handler.try_borrow_mut() {
                            (&mut *handler)(&frame);
                        }
                    }
                }
                Effect::Inserted { offset, text } => {
                    let handlers = self.inner.handlers.borrow().insert_handlers();
                    for handler in handlers {
                        if self.inner.aborted.get() {
                            break;
                        }
                        if let Ok(mut handler) = handler.try_borrow_mut() {
                            (&mut *handler)(offset, &text);
                        }
                    }
                }
                Effect::Removed { offset, count } => {
                    let handlers = self.inner.handlers.borrow().remove_handlers();
                    for handler in handlers {
                        if self.inner.aborted.get() {
                            break;
                        }
                        if let Ok(mut handler) = handler.try_borrow_mut() {
                            (&mut *handler)(offset, count);
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_borrow() {
            Ok(state) => f
                .debug_struct("SyncEngine")
                .field("peer", &state.peer)
                .field("channel", &state.channel)
                .field("phase", &self.phase())
                .field("head", &state.log.head())
                .field("pending", &state.pending.len())
                .finish(),
            Err(_) => f.debug_struct("SyncEngine").finish_non_exhaustive(),
        }
    }
}
