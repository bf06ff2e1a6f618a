//! Error types for the sync engine.

use chainpad_core::CoreError;
use chainpad_log::LogError;
use thiserror::Error;

/// Errors that can occur while driving a sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A frame or message body could not be decoded.
    #[error("format error: {0}")]
    Format(String),

    /// A patch failed hash verification.
    #[error("chain integrity: {0}")]
    ChainIntegrity(String),

    /// Coordinates outside the document.
    #[error("out of range: offset {offset} + remove {to_remove} exceeds length {len}")]
    OutOfRange {
        offset: usize,
        to_remove: usize,
        len: usize,
    },

    /// A well-formed frame that is not valid in the current state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The engine was aborted.
    #[error("engine aborted")]
    Aborted,

    /// A bounded retry loop gave up.
    #[error("retry exhausted after {attempts} attempts")]
    RetryExhausted { attempts: usize },

    /// Other operation log failure.
    #[error("log error: {0}")]
    Log(LogError),
}

impl From<LogError> for SyncError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Integrity { .. } => SyncError::ChainIntegrity(err.to_string()),
            LogError::OutOfRange {
                offset,
                to_remove,
                len,
                ..
            } => SyncError::OutOfRange {
                offset,
                to_remove,
                len,
            },
            LogError::Core(core) => core.into(),
            other => SyncError::Log(other),
        }
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfRange {
                offset,
                to_remove,
                len,
            } => SyncError::OutOfRange {
                offset,
                to_remove,
                len,
            },
            CoreError::HashMismatch { .. } => SyncError::ChainIntegrity(err.to_string()),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
