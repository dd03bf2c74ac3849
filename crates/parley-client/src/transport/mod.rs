//! Publish/subscribe transport: STOMP 1.2 framing over a WebSocket.

pub mod stomp;
pub mod ws;

pub use stomp::{Command, Frame, StompError};
pub use ws::StompTransport;
