//! Console client for Parley
//!
//! Wires the Sans-IO [`parley_core::SyncEngine`] to real I/O: STOMP over a
//! WebSocket for live delivery, HTTP for channel lists and history, a tokio
//! event loop for polling and fetches, and a line-oriented console.
//!
//! # Components
//!
//! - [`config`]: command-line and environment configuration
//! - [`transport`]: STOMP codec and WebSocket [`parley_core::Transport`]
//! - [`rest`]: REST collaborator
//! - [`runtime`]: async event loop
//! - [`console`]: input parsing and plain-text rendering

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clock;
pub mod config;
pub mod console;
pub mod rest;
pub mod runtime;
pub mod transport;

pub use clock::SystemClock;
pub use config::{Args, ClientConfig, ConfigError};
pub use console::ConsoleRenderer;
pub use rest::{HttpRest, Rest, RestError};
pub use runtime::{Input, Renderer, Runtime, RuntimeError};
pub use transport::{StompError, StompTransport};
