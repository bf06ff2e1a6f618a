//! # ChainPad Sync
//!
//! Peer-side sync engine: local edits, remote merges, handshake, framing.
//!
//! ## Overview
//!
//! Each peer runs one [`SyncEngine`] per channel. Engines never talk to each
//! other directly: outbound frames go to `on_message` handlers, and a relay
//! copies them to the other peers with no ordering or delivery guarantee.
//! Patches are hash-chained, so any arrival order converges.
//!
//! ## Key Properties
//!
//! - **Idempotent**: delivering a frame twice changes nothing
//! - **Order-independent**: patches with unknown parents wait for them
//! - **Reentrant**: handlers may call back into the engine, including `abort()`
//!
//! ## Usage
//!
//! ```rust
//! use chainpad_sync::SyncEngine;
//!
//! let engine = SyncEngine::new("alice", "doc", "key", "");
//! engine.on_message(|frame| {
//!     // hand the frame to the relay
//!     let _ = frame;
//! });
//! engine.start().unwrap();
//! engine.insert(0, "hello").unwrap();
//! assert_eq!(engine.document(), "hello");
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Peer A                  Relay                   Peer B
//!   |--- [0] register ----->|                        |
//!   |<-- [1] ack -----------|--- [0] register ------>|
//!   |                       |<-- [1] ack + chain ----|
//!   |<-- [1] ack + chain ---|                        |
//!   |--- [2] patch -------->|--- [2] patch --------->|
//!   |<-- [2] patch ---------|<-- [2] patch ----------|  (rebroadcast)
//!   |--- [3] history ------>|--- [3] history ------->|  (after a bad patch)
//! ```

pub mod codec;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod pending;
pub mod retry;

pub use codec::{decode_fields, encode_fields, limits};
pub use convergence::{state_hash, verify_convergence, verify_pair, ConvergenceResult};
pub use engine::{Delivery, EngineConfig, Phase, RangePolicy, SyncEngine};
pub use error::{Result, SyncError};
pub use handlers::{EventKind, InsertHandler, MessageHandler, RemoveHandler};
pub use messages::{ChannelId, Frame, Message, PeerId};
pub use pending::{PendingOp, PendingQueue};
pub use retry::BoundedRetry;
