//! Error types for the operation log.

use chainpad_core::{CoreError, PatchHash};
use thiserror::Error;

/// Errors that can occur while appending to or reading from the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The patch hash does not match its contents.
    #[error("chain integrity: patch {claimed} hashes to {computed}")]
    Integrity {
        claimed: PatchHash,
        computed: PatchHash,
    },

    /// The operation does not fit the document at its parent.
    #[error("patch {hash} out of range: offset {offset} + remove {to_remove} exceeds length {len}")]
    OutOfRange {
        hash: PatchHash,
        offset: usize,
        to_remove: usize,
        len: usize,
    },

    /// Too many patches are waiting for their parents.
    #[error("buffer full: {limit} patches awaiting parents")]
    BufferFull { limit: usize },

    /// The patch is not stored in this log.
    #[error("unknown patch: {0}")]
    UnknownPatch(PatchHash),

    /// Error from the core primitives.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
