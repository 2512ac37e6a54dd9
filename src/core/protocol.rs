//! Play channel wire protocol
//!
//! Three inbound events carry game content; one outbound event carries
//! player input. Event names are a server contract and must not change.
//!
//! | Event    | Direction | Payload                          |
//! |----------|-----------|----------------------------------|
//! | `output` | in        | `"text"` or `{ "output": text }` |
//! | `gmcp`   | in        | `{ "key": k, "data": any }`      |
//! | `option` | in        | `{ "signal": s, "value": any }`  |
//! | `send`   | out       | `{ "message": "line\n" }`        |

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::input::InputMode;

/// Channel topic joined for a play session
pub const PLAY_TOPIC: &str = "play:client";

pub const EVENT_OUTPUT: &str = "output";
pub const EVENT_VARIABLE: &str = "gmcp";
pub const EVENT_OPTION: &str = "option";
pub const EVENT_SEND: &str = "send";

/// Negotiation signal switching the prompt between text and password input
pub const SIGNAL_PROMPT_TYPE: &str = "prompt_type";

/// Line terminator appended to every submitted line
pub const LINE_TERMINATOR: &str = "\n";

/// A frame that could not be classified
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed {event} payload: {source}")]
    BadPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Undecodable message: {0}")]
    Envelope(String),
}

/// An inbound frame, classified by kind
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Transcript text, escape codes intact
    Text(String),
    /// Structured session variable
    Variable { key: String, data: Value },
    /// Protocol-level signal
    Negotiation(Negotiation),
}

/// Negotiation signals understood by the client
#[derive(Debug, Clone, PartialEq)]
pub enum Negotiation {
    PromptType(InputMode),
    /// Anything else; ignored for forward compatibility
    Unknown { signal: String, value: Value },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutputPayload {
    Bare(String),
    Wrapped { output: String },
}

#[derive(Deserialize)]
struct VariablePayload {
    #[serde(alias = "module")]
    key: String,
    data: Value,
}

#[derive(Deserialize)]
struct OptionPayload {
    #[serde(alias = "key", alias = "type")]
    signal: String,
    #[serde(default)]
    value: Value,
}

/// Classify one inbound event
pub fn classify(event: &str, payload: &Value) -> Result<Frame, DecodeError> {
    match event {
        EVENT_OUTPUT => {
            let text = match parse::<OutputPayload>(EVENT_OUTPUT, payload)? {
                OutputPayload::Bare(text) => text,
                OutputPayload::Wrapped { output } => output,
            };
            Ok(Frame::Text(text))
        }
        EVENT_VARIABLE => {
            let VariablePayload { key, data } = parse(EVENT_VARIABLE, payload)?;
            Ok(Frame::Variable { key, data })
        }
        EVENT_OPTION => {
            let OptionPayload { signal, value } = parse(EVENT_OPTION, payload)?;
            Ok(Frame::Negotiation(negotiation(signal, value)))
        }
        other => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}

/// Payload for the outbound `send` event
pub fn send_payload(line: &str) -> Value {
    json!({ "message": format!("{line}{LINE_TERMINATOR}") })
}

fn parse<'a, T: Deserialize<'a>>(event: &'static str, payload: &'a Value) -> Result<T, DecodeError> {
    T::deserialize(payload).map_err(|source| DecodeError::BadPayload { event, source })
}

fn negotiation(signal: String, value: Value) -> Negotiation {
    if signal == SIGNAL_PROMPT_TYPE {
        if let Some(mode) = value.as_str().and_then(InputMode::from_signal_value) {
            return Negotiation::PromptType(mode);
        }
    }
    Negotiation::Unknown { signal, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_frames() {
        let bare = classify("output", &json!("\x1b[32mHello\x1b[0m\r\n")).unwrap();
        assert_eq!(bare, Frame::Text("\x1b[32mHello\x1b[0m\r\n".to_string()));

        let wrapped = classify("output", &json!({"output": "> "})).unwrap();
        assert_eq!(wrapped, Frame::Text("> ".to_string()));
    }

    #[test]
    fn test_variable_frame() {
        let frame = classify("gmcp", &json!({"key": "vitals", "data": {"hp": 50}})).unwrap();
        assert_eq!(frame, Frame::Variable {
            key: "vitals".to_string(),
            data: json!({"hp": 50}),
        });

        let legacy = classify("gmcp", &json!({"module": "Room.Info", "data": null})).unwrap();
        assert_eq!(legacy, Frame::Variable {
            key: "Room.Info".to_string(),
            data: Value::Null,
        });
    }

    #[test]
    fn test_prompt_type_negotiation() {
        let frame = classify("option", &json!({"signal": "prompt_type", "value": "password"})).unwrap();
        assert_eq!(frame, Frame::Negotiation(Negotiation::PromptType(InputMode::Password)));

        let legacy = classify("option", &json!({"key": "prompt_type", "value": "text"})).unwrap();
        assert_eq!(legacy, Frame::Negotiation(Negotiation::PromptType(InputMode::Text)));
    }

    #[test]
    fn test_unknown_signal_is_not_an_error() {
        let frame = classify("option", &json!({"signal": "echo", "value": false})).unwrap();
        assert!(matches!(frame, Frame::Negotiation(Negotiation::Unknown { ref signal, .. }) if signal == "echo"));

        let frame = classify("option", &json!({"signal": "prompt_type", "value": "hidden"})).unwrap();
        assert!(matches!(frame, Frame::Negotiation(Negotiation::Unknown { .. })));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            classify("gmcp", &json!({"key": 5, "data": {}})),
            Err(DecodeError::BadPayload { event: "gmcp", .. })
        ));
        assert!(matches!(
            classify("output", &json!(17)),
            Err(DecodeError::BadPayload { event: "output", .. })
        ));
        assert!(matches!(
            classify("option", &json!("prompt_type")),
            Err(DecodeError::BadPayload { event: "option", .. })
        ));
    }

    #[test]
    fn test_unknown_event() {
        assert!(matches!(
            classify("presence_diff", &json!({})),
            Err(DecodeError::UnknownEvent(ref e)) if e == "presence_diff"
        ));
    }

    #[test]
    fn test_send_payload_appends_terminator() {
        assert_eq!(send_payload("look"), json!({"message": "look\n"}));
        assert_eq!(send_payload(""), json!({"message": "\n"}));
    }
}
