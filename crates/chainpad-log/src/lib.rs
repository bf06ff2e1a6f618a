//! # ChainPad Log
//!
//! Append-only patch tree for a single channel.
//!
//! ## Overview
//!
//! Every replica keeps every valid patch it has seen, arranged as a tree by
//! parent hash. The head is chosen deterministically (deepest tip, then lowest
//! hash), so replicas that hold the same patches agree on the document.
//!
//! ## Key Types
//!
//! - [`OperationLog`] - The tree, the buffer of orphans, and head selection
//! - [`PatchStore`] - Storage trait for validated patches
//! - [`MemoryStore`] - In-memory store
//! - [`AppendResult`] / [`HeadChange`] - What an append did
//!
//! ## Usage
//!
//! ```rust
//! use chainpad_core::{Patch, TextOperation};
//! use chainpad_log::{AppendResult, OperationLog};
//!
//! let mut log = OperationLog::new("channel", "");
//! let patch = Patch::new(log.root(), TextOperation::insert(0, "hi"));
//! assert!(matches!(log.append(patch).unwrap(), AppendResult::Accepted(_)));
//! assert_eq!(log.content().unwrap(), "hi");
//! ```

pub mod error;
pub mod log;
pub mod memory;
pub mod traits;

pub use error::{LogError, Result};
pub use log::{Accepted, AppendResult, HeadChange, LogConfig, OperationLog};
pub use memory::MemoryStore;
pub use traits::{InsertResult, PatchStore, StoredPatch};
