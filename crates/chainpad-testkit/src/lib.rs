//! # ChainPad Testkit
//!
//! Testing utilities for ChainPad.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical bytes and frames every replica must reproduce
//! - **Generators**: Proptest strategies and seeded random edits
//! - **Relay**: An in-memory relay with reordering and duplicating delivery modes
//! - **Fixtures**: A channel of peers wired to a relay, with notification mirrors
//!
//! ## Golden Vectors
//!
//! ```rust
//! use chainpad_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hash) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, hash);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use chainpad_testkit::{DeliveryMode, TestFixture};
//!
//! let fixture = TestFixture::new(2, DeliveryMode::Shuffled { seed: 1 });
//! fixture.start_all().unwrap();
//! fixture.engines[0].insert(0, "hello").unwrap();
//! fixture.settle().unwrap();
//! assert_eq!(fixture.engines[1].document(), "hello");
//! ```

pub mod fixtures;
pub mod generators;
pub mod relay;
pub mod vectors;

pub use fixtures::{fixture_config, Mirror, TestFixture, CHANNEL, KEY};
pub use generators::{random_edit, random_operation, Edit};
pub use relay::{ack_frame, DeliveryMode, MemoryRelay, RelayStats};
pub use vectors::{all_vectors, frame_vectors, verify_all_vectors, FrameVector, GoldenVector};
