//! Phoenix channel message codec
//!
//! Messages use the v2 JSON serializer: a five element array
//! `[join_ref, ref, topic, event, payload]`.
//!
//! [`ChannelState`] tracks refs for one channel and turns incoming messages
//! into [`TransportEvent`]s. It does no I/O, so the socket task stays small.

use serde_json::{json, Value};

use super::TransportEvent;

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const HEARTBEAT_TOPIC: &str = "phoenix";

/// Serializer version requested in the socket URL
pub const VSN: &str = "2.0.0";

/// One channel message
#[derive(Debug, Clone, PartialEq)]
pub struct PhoenixMessage {
    pub join_ref: Option<String>,
    pub msg_ref: Option<String>,
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

impl PhoenixMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&(
            &self.join_ref,
            &self.msg_ref,
            &self.topic,
            &self.event,
            &self.payload,
        ))
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let (join_ref, msg_ref, topic, event, payload): (
            Option<String>,
            Option<String>,
            String,
            String,
            Value,
        ) = serde_json::from_str(text)?;

        Ok(Self {
            join_ref,
            msg_ref,
            topic,
            event,
            payload,
        })
    }
}

/// Append the serializer version to a socket endpoint URL
pub fn socket_url(endpoint: &str) -> String {
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{sep}vsn={VSN}")
}

/// Ref bookkeeping for a single joined channel
#[derive(Debug, Default)]
pub struct ChannelState {
    topic: Option<String>,
    join_ref: Option<String>,
    next_ref: u64,
    joined: bool,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    fn make_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    pub fn join_message(&mut self, topic: &str, params: Value) -> PhoenixMessage {
        let join_ref = self.make_ref();
        self.topic = Some(topic.to_string());
        self.join_ref = Some(join_ref.clone());
        self.joined = false;

        PhoenixMessage {
            join_ref: Some(join_ref.clone()),
            msg_ref: Some(join_ref),
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload: params,
        }
    }

    /// `None` until a join has been sent
    pub fn push_message(&mut self, event: &str, payload: Value) -> Option<PhoenixMessage> {
        let topic = self.topic.clone()?;
        let msg_ref = self.make_ref();

        Some(PhoenixMessage {
            join_ref: self.join_ref.clone(),
            msg_ref: Some(msg_ref),
            topic,
            event: event.to_string(),
            payload,
        })
    }

    pub fn leave_message(&mut self) -> Option<PhoenixMessage> {
        let message = self.push_message(EVENT_LEAVE, json!({}))?;
        self.joined = false;
        Some(message)
    }

    pub fn heartbeat_message(&mut self) -> PhoenixMessage {
        PhoenixMessage {
            join_ref: None,
            msg_ref: Some(self.make_ref()),
            topic: HEARTBEAT_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
        }
    }

    /// Interpret an incoming message for this channel.
    ///
    /// Returns `None` for traffic the session does not care about: other
    /// topics, heartbeat and push replies, messages from a stale join.
    pub fn route(&mut self, message: PhoenixMessage) -> Option<TransportEvent> {
        if self.topic.as_deref() != Some(message.topic.as_str()) {
            return None;
        }
        if message.join_ref.is_some() && message.join_ref != self.join_ref {
            return None;
        }

        match message.event.as_str() {
            EVENT_REPLY => {
                let is_join_reply = !self.joined && message.msg_ref == self.join_ref;
                if !is_join_reply {
                    return None;
                }

                let status = message.payload.get("status").and_then(Value::as_str);
                if status == Some("ok") {
                    self.joined = true;
                    Some(TransportEvent::JoinOk)
                } else {
                    Some(TransportEvent::JoinError(join_error_reason(&message.payload)))
                }
            }
            EVENT_ERROR => {
                self.joined = false;
                Some(TransportEvent::Disconnected("channel crashed".to_string()))
            }
            EVENT_CLOSE => {
                self.joined = false;
                Some(TransportEvent::Disconnected("channel closed by server".to_string()))
            }
            _ => Some(TransportEvent::Message {
                event: message.event,
                payload: message.payload,
            }),
        }
    }
}

fn join_error_reason(payload: &Value) -> String {
    let response = payload.get("response");
    match response.and_then(|r| r.get("reason")).and_then(Value::as_str) {
        Some(reason) => reason.to_string(),
        None => match response {
            Some(r) if !r.is_null() => format!("join rejected: {r}"),
            _ => "join rejected".to_string(),
        },
    }
}
