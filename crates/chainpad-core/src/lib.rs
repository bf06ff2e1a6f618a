//! # ChainPad Core
//!
//! Pure primitives for ChainPad: text operations, patches, and hash chaining.
//!
//! This crate contains no I/O, no networking, no engine state. It is pure
//! computation over documents and hash-linked patches.
//!
//! ## Key Types
//!
//! - [`TextOperation`] - Insert/remove primitive with a transform/compose algebra
//! - [`Patch`] - A hash-chained record of one committed operation
//! - [`PatchHash`] - Content-addressed identifier (Blake3 hash)
//!
//! ## Hashing
//!
//! Operations are hashed over deterministic CBOR. See [`canonical`] and
//! [`chain`] modules.

pub mod canonical;
pub mod chain;
pub mod error;
pub mod operation;
pub mod patch;
pub mod text;
pub mod types;

pub use canonical::{canonical_operation_bytes, canonical_root_bytes};
pub use chain::{patch_hash, root_hash};
pub use error::{CoreError, Result};
pub use operation::TextOperation;
pub use patch::Patch;
pub use types::PatchHash;
