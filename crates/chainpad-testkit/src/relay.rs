//! An in-memory relay for testing.
//!
//! Behaves like the channel server peers talk through: it acknowledges every
//! handshake, strips the channel field, and forwards each frame to every other
//! joined peer. Delivery order is controlled by [`DeliveryMode`] so tests can
//! reorder and duplicate frames deterministically. Only [`DeliveryMode::Chaotic`]
//! lets other frames overtake an acknowledgement.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chainpad_sync::{
    decode_fields, encode_fields, BoundedRetry, Frame, Message, PeerId, Phase, Result, SyncEngine,
};

/// How queued frames are picked for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// First in, first out.
    InOrder,
    /// Uniformly random order.
    Shuffled { seed: u64 },
    /// Random order; every frame may also be delivered a second time.
    Duplicating { seed: u64 },
    /// Random order, acknowledgements included.
    Chaotic { seed: u64 },
}

/// Counters for one relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Frames queued for a peer.
    pub forwarded: usize,
    /// Frames handed to an engine.
    pub delivered: usize,
    /// Deliveries the engine refused.
    pub rejected: usize,
}

#[derive(Debug, Clone)]
struct Envelope {
    to: PeerId,
    frame: Bytes,
    duplicated: bool,
}

struct RelayState {
    mode: DeliveryMode,
    rng: StdRng,
    peers: Vec<SyncEngine>,
    /// Handshake acknowledgements, delivered before anything else unless chaotic.
    urgent: VecDeque<Envelope>,
    queue: VecDeque<Envelope>,
    stats: RelayStats,
}

impl RelayState {
    /// Route one outbound frame from `from`.
    fn submit(&mut self, from: &PeerId, raw: &[u8]) {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%from, error = %err, "relay dropping malformed frame");
                return;
            }
        };
        let Some(stripped) = strip_channel(raw) else {
            return;
        };

        if frame.message == Message::Register {
            let ack = Envelope {
                to: from.clone(),
                frame: ack_frame(&frame.key),
                duplicated: false,
            };
            match self.mode {
                DeliveryMode::Chaotic { .. } => self.queue.push_back(ack),
                _ => self.urgent.push_back(ack),
            }
        }

        let targets: Vec<PeerId> = self
            .peers
            .iter()
            .map(SyncEngine::peer)
            .filter(|peer| peer != from)
            .collect();
        for to in targets {
            self.stats.forwarded += 1;
            self.queue.push_back(Envelope {
                to,
                frame: stripped.clone(),
                duplicated: false,
            });
        }
    }

    fn next(&mut self) -> Option<Envelope> {
        if let Some(envelope) = self.urgent.pop_front() {
            return Some(envelope);
        }
        if self.queue.is_empty() {
            return None;
        }
        match self.mode {
            DeliveryMode::InOrder => self.queue.pop_front(),
            DeliveryMode::Shuffled { .. } | DeliveryMode::Chaotic { .. } => {
                let index = self.rng.gen_range(0..self.queue.len());
                self.queue.remove(index)
            }
            DeliveryMode::Duplicating { .. } => {
                let index = self.rng.gen_range(0..self.queue.len());
                let envelope = self.queue.remove(index)?;
                if !envelope.duplicated && self.rng.gen_bool(0.3) {
                    self.queue.push_back(Envelope {
                        duplicated: true,
                        ..envelope.clone()
                    });
                }
                Some(envelope)
            }
        }
    }

    fn engine(&self, peer: &PeerId) -> Option<SyncEngine> {
        self.peers.iter().find(|e| e.peer() == *peer).cloned()
    }
}

/// The acknowledgement the relay sends for a handshake.
pub fn ack_frame(key: &str) -> Bytes {
    let fields: [&[u8]; 3] = [b"", key.as_bytes(), b"[1]"];
    encode_fields(&fields)
}

/// Drop the channel field of a four-field frame.
fn strip_channel(raw: &[u8]) -> Option<Bytes> {
    let fields = decode_fields(raw).ok()?;
    match fields.len() {
        4 => Some(encode_fields(&fields[1..])),
        3 => Some(Bytes::copy_from_slice(raw)),
        _ => None,
    }
}

/// In-memory relay shared by the engines of one channel.
#[derive(Clone)]
pub struct MemoryRelay {
    state: Rc<RefCell<RelayState>>,
}

impl MemoryRelay {
    /// Create a relay.
    pub fn new(mode: DeliveryMode) -> Self {
        let seed = match mode {
            DeliveryMode::InOrder => 0,
            DeliveryMode::Shuffled { seed }
            | DeliveryMode::Duplicating { seed }
            | DeliveryMode::Chaotic { seed } => seed,
        };
        Self {
            state: Rc::new(RefCell::new(RelayState {
                mode,
                rng: StdRng::seed_from_u64(seed),
                peers: Vec::new(),
                urgent: VecDeque::new(),
                queue: VecDeque::new(),
                stats: RelayStats::default(),
            })),
        }
    }

    /// Connect an engine: its outbound frames are routed through this relay.
    ///
    /// Call before `start()` so the handshake is seen.
    pub fn join(&self, engine: &SyncEngine) {
        let from = engine.peer();
        let relay: Weak<RefCell<RelayState>> = Rc::downgrade(&self.state);
        engine.on_message(move |raw| {
            if let Some(state) = relay.upgrade() {
                state.borrow_mut().submit(&from, raw);
            }
        });
        self.state.borrow_mut().peers.push(engine.clone());
    }

    /// Joined engines.
    pub fn engines(&self) -> Vec<SyncEngine> {
        self.state.borrow().peers.clone()
    }

    /// Frames waiting for delivery.
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.urgent.len() + state.queue.len()
    }

    pub fn stats(&self) -> RelayStats {
        self.state.borrow().stats
    }

    /// Deliver one frame. Returns false when nothing is queued.
    pub fn deliver_next(&self) -> bool {
        let next = self.state.borrow_mut().next();
        let Some(envelope) = next else {
            return false;
        };
        let target = self.state.borrow().engine(&envelope.to);
        let Some(engine) = target else {
            return true;
        };
        if engine.phase() == Phase::Aborted {
            return true;
        }

        // The engine may submit new frames while handling this one.
        let result = engine.message(&envelope.frame);
        let mut state = self.state.borrow_mut();
        state.stats.delivered += 1;
        if let Err(err) = result {
            tracing::trace!(to = %envelope.to, error = %err, "delivery rejected");
            state.stats.rejected += 1;
        }
        true
    }

    /// Deliver until the queue is empty. Returns the number of frames delivered.
    pub fn deliver_all(&self) -> usize {
        let mut count = 0;
        while self.deliver_next() {
            count += 1;
        }
        count
    }

    /// Alternate delivery and `sync()` on every engine until both are idle.
    ///
    /// Returns the number of rounds taken.
    pub fn settle(&self, retry: BoundedRetry) -> Result<usize> {
        retry.run(|round| {
            self.deliver_all();
            let mut emitted = 0;
            for engine in self.engines() {
                if engine.phase() != Phase::Started {
                    continue;
                }
                match engine.sync() {
                    Ok(n) => emitted += n,
                    Err(err) => tracing::warn!(peer = %engine.peer(), error = %err, "sync failed"),
                }
            }
            if emitted == 0 && self.pending() == 0 {
                ControlFlow::Break(round + 1)
            } else {
                ControlFlow::Continue(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_literal() {
        assert_eq!(&ack_frame("abc")[..], b"0:3:abc3:[1]");
    }

    #[test]
    fn test_strip_channel() {
        let stripped = strip_channel(b"1:y5:alice3:abc3:[0]").unwrap();
        assert_eq!(&stripped[..], b"5:alice3:abc3:[0]");
        assert!(strip_channel(b"1:a").is_none());
    }

    #[test]
    fn test_handshake_acknowledged() {
        let relay = MemoryRelay::new(DeliveryMode::InOrder);
        let engine = SyncEngine::new("alice", "y", "abc", "");
        relay.join(&engine);
        engine.start().unwrap();
        assert!(!engine.is_registered());

        relay.deliver_all();
        assert!(engine.is_registered());
        assert_eq!(relay.stats().forwarded, 0);
    }

    #[test]
    fn test_frames_forwarded_to_others_only() {
        let relay = MemoryRelay::new(DeliveryMode::InOrder);
        let a = SyncEngine::new("alice", "y", "abc", "");
        let b = SyncEngine::new("bob", "y", "abc", "");
        relay.join(&a);
        relay.join(&b);
        a.start().unwrap();
        b.start().unwrap();
        relay.settle(BoundedRetry::default()).unwrap();

        a.insert(0, "hi").unwrap();
        relay.settle(BoundedRetry::default()).unwrap();
        assert_eq!(b.document(), "hi");
        assert_eq!(relay.stats().rejected, 0);
    }
}
