//! Persistent channel transport.
//!
//! The session engine only sees the [`Transport`] trait: join a topic, push
//! events, leave. Everything the transport hears back (join outcome, inbound
//! events, disconnects) is delivered as [`TransportEvent`]s that the owner of
//! the session feeds into [`Session::handle_event`](crate::core::session::Session::handle_event).
//!
//! # Architecture
//!
//! ```text
//! UI loop ──push/leave──▶ WebSocketTransport ──mpsc──▶ socket thread (tokio)
//!    ▲                                                       │
//!    └──────── poll_events() ◀──── std mpsc ◀── TransportEvent
//! ```

pub mod phoenix;
pub mod websocket;

#[cfg(test)]
pub mod mock;

use serde_json::Value;
use thiserror::Error;

pub use websocket::WebSocketTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to start transport: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Channel already joined")]
    AlreadyJoined,

    #[error("Transport is closed")]
    Closed,

    #[error("Failed to encode message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Notifications from the transport back to the session
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The channel join was accepted
    JoinOk,
    /// The join was rejected or the server could not be reached
    JoinError(String),
    /// An event pushed by the server on the joined channel
    Message { event: String, payload: Value },
    /// A message that could not be decoded at the envelope level
    Undecodable(String),
    /// The connection dropped without the client asking for it
    Disconnected(String),
}

/// The channel primitive the session engine drives
pub trait Transport {
    /// Request to join `topic`. The outcome arrives later as
    /// [`TransportEvent::JoinOk`] or [`TransportEvent::JoinError`].
    fn join(&mut self, topic: &str, params: Value) -> Result<()>;

    /// Send an event on the joined channel without waiting for a reply
    fn push(&mut self, event: &str, payload: Value) -> Result<()>;

    /// Leave the channel and release the connection
    fn leave(&mut self);
}
