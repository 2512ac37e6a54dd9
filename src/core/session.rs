//! Session management
//!
//! The session owns the channel transport and is the single writer of the
//! transcript, the variable store and the prompt input state. The owner
//! (the UI loop) feeds it transport events and user actions; renderers read
//! it through [`SessionView`].
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──join ok──▶ Joined ──close()──▶ Closed
//!      │                    │
//!      └──join error──▶ Errored ◀──disconnect──┘
//! ```
//!
//! `Closed` and `Errored` are terminal: later frames are dropped and
//! `submit_line` stops transmitting.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::input::{InputMode, InputState};
use super::protocol::{self, DecodeError, Frame, Negotiation, PLAY_TOPIC};
use super::variables::VariableStore;
use crate::transport::{Transport, TransportError, TransportEvent};

/// Connection status visible to the renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Joined,
    Closed,
    Errored,
}

impl ConnectionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionStatus::Closed | ConnectionStatus::Errored)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Joined => "connected",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Errored => "disconnected",
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session already started")]
    AlreadyStarted,

    #[error("Session has ended")]
    Ended,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Read-only view of a session for rendering
pub trait SessionView {
    fn status(&self) -> ConnectionStatus;
    /// Raw text chunks in arrival order, escape codes intact
    fn transcript(&self) -> &[String];
    fn variables(&self) -> &VariableStore;
    fn input(&self) -> &InputState;
    fn last_error(&self) -> Option<&str>;
}

/// A play session over one channel
pub struct Session<T: Transport> {
    transport: T,
    status: ConnectionStatus,
    started: bool,
    transcript: Vec<String>,
    variables: VariableStore,
    input: InputState,
    /// Frames dropped because they could not be classified
    anomalies: u64,
    last_error: Option<String>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            status: ConnectionStatus::Connecting,
            started: false,
            transcript: Vec::new(),
            variables: VariableStore::new(),
            input: InputState::new(),
            anomalies: 0,
            last_error: None,
        }
    }

    /// Ask the transport to join the play channel for `game`.
    ///
    /// The credential is forwarded untouched as a join parameter. The join
    /// outcome arrives later through [`Session::handle_event`].
    pub fn start(&mut self, game: &str, credential: &str) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::Ended);
        }
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;

        info!(game = %game, "joining play channel");
        let params = json!({ "game": game, "token": credential });
        if let Err(e) = self.transport.join(PLAY_TOPIC, params) {
            self.fail(format!("connection failed: {e}"));
            return Err(e.into());
        }
        Ok(())
    }

    /// Apply one notification from the transport
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::JoinOk => {
                if self.status == ConnectionStatus::Connecting {
                    info!("joined play channel");
                    self.status = ConnectionStatus::Joined;
                }
            }
            TransportEvent::JoinError(reason) => {
                if self.status == ConnectionStatus::Connecting {
                    self.fail(format!("connection failed: {reason}"));
                }
            }
            TransportEvent::Message { event, payload } => {
                self.dispatch(&event, &payload);
            }
            TransportEvent::Undecodable(reason) => {
                if !self.status.is_terminal() {
                    self.record_anomaly(&DecodeError::Envelope(reason));
                }
            }
            TransportEvent::Disconnected(reason) => {
                if !self.status.is_terminal() {
                    self.fail(format!("disconnected: {reason}"));
                }
            }
        }
    }

    /// Classify and apply one inbound frame
    pub fn dispatch(&mut self, event: &str, payload: &Value) {
        if self.status.is_terminal() {
            return;
        }

        match protocol::classify(event, payload) {
            Ok(Frame::Text(text)) => self.transcript.push(text),
            Ok(Frame::Variable { key, data }) => self.variables.set(key, data),
            Ok(Frame::Negotiation(Negotiation::PromptType(mode))) => {
                debug!(mode = mode.as_str(), "prompt mode changed");
                self.input.set_mode(mode);
            }
            Ok(Frame::Negotiation(Negotiation::Unknown { signal, .. })) => {
                debug!(signal = %signal, "ignoring negotiation signal");
            }
            Err(e) => self.record_anomaly(&e),
        }
    }

    /// Submit the prompt buffer and send it with a line terminator.
    ///
    /// Does nothing unless joined. Returns the submitted line.
    pub fn submit_line(&mut self) -> Option<String> {
        if self.status != ConnectionStatus::Joined {
            return None;
        }

        let line = self.input.submit();
        if let Err(e) = self.transport.push(protocol::EVENT_SEND, protocol::send_payload(&line)) {
            warn!(err = %e, "failed to send line");
            self.fail(format!("disconnected: {e}"));
            return None;
        }
        Some(line)
    }

    /// Leave the channel. Idempotent; an errored session stays errored.
    pub fn close(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        if self.started {
            self.transport.leave();
        }
        self.status = ConnectionStatus::Closed;
        info!("session closed");
    }

    pub fn set_current_text(&mut self, text: impl Into<String>) {
        self.input.set_current_text(text);
    }

    pub fn scroll_backward(&mut self) {
        self.input.scroll_backward();
    }

    pub fn scroll_forward(&mut self) {
        self.input.scroll_forward();
    }

    pub fn mode(&self) -> InputMode {
        self.input.mode()
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomalies
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn fail(&mut self, reason: String) {
        warn!(reason = %reason, "session errored");
        self.status = ConnectionStatus::Errored;
        self.last_error = Some(reason);
    }

    fn record_anomaly(&mut self, error: &DecodeError) {
        self.anomalies += 1;
        warn!(err = %error, count = self.anomalies, "dropping undecodable frame");
    }
}

impl<T: Transport> SessionView for Session<T> {
    fn status(&self) -> ConnectionStatus {
        self.status
    }

    fn transcript(&self) -> &[String] {
        &self.transcript
    }

    fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn input(&self) -> &InputState {
        &self.input
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
