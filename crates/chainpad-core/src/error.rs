//! Error types for ChainPad Core.

use thiserror::Error;

use crate::types::PatchHash;

/// Core errors that can occur while applying or verifying operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("operation out of range: offset {offset} + remove {to_remove} exceeds length {len}")]
    OutOfRange {
        offset: usize,
        to_remove: usize,
        len: usize,
    },

    #[error("patch hash mismatch: claimed {claimed}, computed {computed}")]
    HashMismatch {
        claimed: PatchHash,
        computed: PatchHash,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
