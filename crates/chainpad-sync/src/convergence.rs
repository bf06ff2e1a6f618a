//! Convergence verification across replicas.
//!
//! Replicas that hold the same chain and no pending edits must hold the same
//! document. These checks compare heads first, then a state hash over the
//! whole chain, then the documents themselves.

use chainpad_core::{Patch, PatchHash};

use crate::engine::SyncEngine;
use crate::error::Result;
use crate::messages::ChannelId;

/// Compute a deterministic state hash for a chain.
///
/// Algorithm:
/// 1. Hash the domain prefix and the channel id
/// 2. Hash: H = Blake3(H_prev || patch_hash) for each patch from root to head
/// 3. Return final H
pub fn state_hash(channel: &ChannelId, chain: &[Patch]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"chainpad-state-v0:");
    hasher.update(channel.as_str().as_bytes());
    for patch in chain {
        hasher.update(patch.hash().as_bytes());
    }
    hasher.finalize()
}

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Identical chains and documents.
    Converged,
    /// Not there yet (more delivery or a `sync()` may be needed).
    NotConverged { reason: String },
    /// Equal depth, different heads: one side has not seen the other's tip.
    Forked {
        depth: u64,
        local_head: PatchHash,
        remote_head: PatchHash,
    },
}

impl ConvergenceResult {
    /// Check if the replicas have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }

    /// Check if a fork was detected.
    pub fn is_forked(&self) -> bool {
        matches!(self, ConvergenceResult::Forked { .. })
    }
}

/// Verify two replicas have converged.
pub fn verify_pair(local: &SyncEngine, remote: &SyncEngine) -> Result<ConvergenceResult> {
    let channel = local.channel();
    if channel != remote.channel() {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!("channel mismatch: local={}, remote={}", channel, remote.channel()),
        });
    }

    for engine in [local, remote] {
        if engine.pending_len() > 0 {
            return Ok(ConvergenceResult::NotConverged {
                reason: format!("{} has {} pending edits", engine.peer(), engine.pending_len()),
            });
        }
    }

    let (local_depth, remote_depth) = (local.head_depth(), remote.head_depth());
    if local_depth != remote_depth {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!(
                "head depth mismatch: local={}, remote={}",
                local_depth, remote_depth
            ),
        });
    }

    let (local_head, remote_head) = (local.head(), remote.head());
    if local_head != remote_head {
        return Ok(ConvergenceResult::Forked {
            depth: local_depth,
            local_head,
            remote_head,
        });
    }

    if state_hash(&channel, &local.chain()?) != state_hash(&channel, &remote.chain()?) {
        return Ok(ConvergenceResult::NotConverged {
            reason: "state hash mismatch".into(),
        });
    }

    if local.document() != remote.document() {
        return Ok(ConvergenceResult::NotConverged {
            reason: "document mismatch".into(),
        });
    }

    Ok(ConvergenceResult::Converged)
}

/// Verify every replica against the first one.
///
/// Returns the first non-converged result.
pub fn verify_convergence(engines: &[SyncEngine]) -> Result<ConvergenceResult> {
    let Some((first, rest)) = engines.split_first() else {
        return Ok(ConvergenceResult::Converged);
    };
    for other in rest {
        let result = verify_pair(first, other)?;
        if !result.is_converged() {
            return Ok(result);
        }
    }
    Ok(ConvergenceResult::Converged)
}
