//! # ChainPad
//!
//! Peer-to-peer collaborative editing of a plain-text document.
//!
//! ## Overview
//!
//! Every peer keeps a hash-chained log of patches and a local document. Edits
//! are queued locally, committed with `sync()`, and relayed to the other peers
//! as frames. Concurrent edits are reconciled by operational transformation,
//! so every peer that saw the same patches shows the same text.
//!
//! ## Key Concepts
//!
//! - **Patch**: Immutable. Identified by the hash of its parent and operation.
//! - **Chain**: The deepest path of patches from the channel root.
//! - **Pending**: Local edits not yet committed, rebased over remote patches.
//! - **Relay**: Copies frames between peers. Trusted for nothing.
//!
//! ## Usage
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let outbox = Rc::new(RefCell::new(Vec::new()));
//! let engine = chainpad::create("alice", "notes", "key", "");
//!
//! let sink = outbox.clone();
//! engine.on_message(move |frame| sink.borrow_mut().push(frame.to_vec()));
//! engine.start().unwrap();
//!
//! // The relay acknowledges the handshake.
//! engine.message(b"0:3:key3:[1]").unwrap();
//!
//! engine.insert(0, "hello").unwrap();
//! assert_eq!(engine.sync().unwrap(), 1);
//!
//! // Handshake, history request, patch.
//! assert_eq!(outbox.borrow().len(), 3);
//! ```
//!
//! ## Re-exports
//!
//! - `chainpad::core` - Operations, patches, hashing
//! - `chainpad::log` - The patch tree
//! - `chainpad::sync` - Engine, framing, convergence checks

// Re-export component crates
pub use chainpad_core as core;
pub use chainpad_log as log;
pub use chainpad_sync as sync;

// Re-export commonly used types
pub use chainpad_core::{Patch, PatchHash, TextOperation};
pub use chainpad_sync::{
    BoundedRetry, ChannelId, ConvergenceResult, Delivery, EngineConfig, EventKind, Phase, PeerId,
    RangePolicy, Result, SyncEngine, SyncError,
};

/// Create an engine for `peer` on `channel` with the default configuration.
///
/// Only allocates: nothing is sent until [`SyncEngine::start`].
pub fn create(
    peer: impl Into<PeerId>,
    channel: impl Into<ChannelId>,
    key: impl Into<String>,
    initial: &str,
) -> SyncEngine {
    create_with_config(peer, channel, key, initial, EngineConfig::default())
}

/// Create an engine with an explicit configuration.
pub fn create_with_config(
    peer: impl Into<PeerId>,
    channel: impl Into<ChannelId>,
    key: impl Into<String>,
    initial: &str,
    config: EngineConfig,
) -> SyncEngine {
    let (peer, channel) = (peer.into(), channel.into());
    tracing::debug!(%peer, %channel, "creating engine");
    SyncEngine::with_config(peer, channel, key, initial, config)
}
