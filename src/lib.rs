//! mudplay - play client core for channel-based MUD servers
//!
//! The server streams three kinds of frames over a Phoenix channel: transcript
//! text with ANSI colour codes, structured variables (vitals, room info) and
//! negotiation signals (e.g. switching the prompt to password input). This
//! crate turns that stream into state a frontend can paint:
//!
//! - [`core::session::Session`] owns the channel and all session state
//! - [`core::ansi::decode`] splits transcript text into styled segments
//! - [`core::gauge::project`] turns variables into current/max readings
//! - [`transport::WebSocketTransport`] speaks the channel protocol
//!
//! Frontends read the session through [`core::session::SessionView`] and
//! drive it with `set_current_text`, `scroll_backward`, `scroll_forward`,
//! `submit_line`, `start` and `close`.

pub mod config;
pub mod core;
pub mod transport;

pub use crate::core::session::{ConnectionStatus, Session, SessionError, SessionView};
