//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use chainpad_core::text::byte_index;
use chainpad_sync::{
    verify_convergence, BoundedRetry, ConvergenceResult, EngineConfig, Result, SyncEngine,
};

use crate::relay::{DeliveryMode, MemoryRelay};

/// Channel used by fixtures.
pub const CHANNEL: &str = "doc";

/// Validation key used by fixtures.
pub const KEY: &str = "key";

/// A copy of an engine's document rebuilt only from insert/remove notifications.
///
/// Local edits are mirrored only while `notify_local_edits` is on.
#[derive(Clone)]
pub struct Mirror {
    text: Rc<RefCell<String>>,
}

impl Mirror {
    /// Attach to an engine, starting from its current document.
    pub fn attach(engine: &SyncEngine) -> Self {
        let text = Rc::new(RefCell::new(engine.document()));

        let sink = text.clone();
        engine.on_insert(move |offset, inserted| {
            let mut text = sink.borrow_mut();
            let at = byte_index(&text, offset).unwrap_or(text.len());
            text.insert_str(at, inserted);
        });
        let sink = text.clone();
        engine.on_remove(move |offset, count| {
            let mut text = sink.borrow_mut();
            let start = byte_index(&text, offset).unwrap_or(text.len());
            let end = byte_index(&text, offset + count).unwrap_or(text.len());
            text.replace_range(start..end, "");
        });

        Self { text }
    }

    /// The mirrored text.
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }
}

/// Configuration used for fixture peers.
pub fn fixture_config() -> EngineConfig {
    EngineConfig {
        strict_transforms: true,
        ..EngineConfig::default()
    }
}

/// A channel with several peers connected through one relay.
pub struct TestFixture {
    pub relay: MemoryRelay,
    pub engines: Vec<SyncEngine>,
    pub mirrors: Vec<Mirror>,
    initial: String,
}

impl TestFixture {
    /// Create `peers` engines on an empty document. Nothing is started.
    pub fn new(peers: usize, mode: DeliveryMode) -> Self {
        Self::with_initial(peers, mode, "")
    }

    /// Create `peers` engines sharing `initial` content.
    pub fn with_initial(peers: usize, mode: DeliveryMode, initial: &str) -> Self {
        let mut fixture = Self {
            relay: MemoryRelay::new(mode),
            engines: Vec::new(),
            mirrors: Vec::new(),
            initial: initial.to_string(),
        };
        for _ in 0..peers {
            fixture.add_peer();
        }
        fixture
    }

    /// Add a peer connected to the relay. It is not started.
    pub fn add_peer(&mut self) -> SyncEngine {
        let peer = format!("peer-{}", self.engines.len());
        let engine = chainpad::create_with_config(peer, CHANNEL, KEY, &self.initial, fixture_config());
        self.relay.join(&engine);
        self.mirrors.push(Mirror::attach(&engine));
        self.engines.push(engine.clone());
        engine
    }

    /// Start every engine and complete the handshakes.
    pub fn start_all(&self) -> Result<()> {
        for engine in &self.engines {
            engine.start()?;
        }
        self.settle()?;
        Ok(())
    }

    /// Deliver and sync until idle.
    pub fn settle(&self) -> Result<usize> {
        self.relay.settle(BoundedRetry::new(200))
    }

    /// Check that all engines hold the same chain and document.
    pub fn convergence(&self) -> Result<ConvergenceResult> {
        verify_convergence(&self.engines)
    }

    /// Check that every mirror matches its engine.
    pub fn mirrors_match(&self) -> bool {
        self.engines
            .iter()
            .zip(&self.mirrors)
            .all(|(engine, mirror)| engine.document() == mirror.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_follows_local_edits() {
        let engine = SyncEngine::with_config("p", CHANNEL, KEY, "héllo", fixture_config());
        let mirror = Mirror::attach(&engine);
        engine.insert(5, " wörld").unwrap();
        engine.remove(0, 2).unwrap();
        assert_eq!(mirror.text(), "llo wörld");
        assert_eq!(mirror.text(), engine.document());
    }

    #[test]
    fn test_fixture_starts_and_registers() {
        let fixture = TestFixture::new(3, DeliveryMode::InOrder);
        fixture.start_all().unwrap();
        assert!(fixture.engines.iter().all(SyncEngine::is_registered));
        assert!(fixture.convergence().unwrap().is_converged());
    }
}
