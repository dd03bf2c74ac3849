//! Deterministic simulation harness for the Parley synchronization engine.
//!
//! In-memory implementations of the [`parley_core::Clock`] and
//! [`parley_core::Transport`] seams, builders for server-shaped payloads, and
//! a [`SimClient`] that drives a [`parley_core::SyncEngine`] the way the
//! production runtime does.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies properties that must hold after every
//! step, not specific scenarios. [`SimClient`] checks
//! [`InvariantRegistry::standard()`] after each event it feeds.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod invariants;
pub mod sim_client;
pub mod transport;
pub mod wire;

pub use clock::ManualClock;
pub use invariants::{
    ActiveVisibleUnreadZero, IdleTranscriptEmpty, Invariant, InvariantRegistry, InvariantResult,
    NoOrphanCounters, SubscriptionsMatchRegistry, SyncSnapshot, Violation,
};
pub use sim_client::{SimClient, SimEngine};
pub use transport::{SimTransport, TransportCall};
