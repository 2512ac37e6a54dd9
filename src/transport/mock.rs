//! In-memory transport for session tests

use serde_json::Value;

use super::{Result, Transport, TransportError};

/// Records every call; optionally fails joins or pushes
#[derive(Debug, Default)]
pub struct MockTransport {
    pub joins: Vec<(String, Value)>,
    pub pushes: Vec<(String, Value)>,
    pub leaves: usize,
    pub fail_join: bool,
    pub fail_push: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MockTransport {
    fn join(&mut self, topic: &str, params: Value) -> Result<()> {
        if self.fail_join {
            return Err(TransportError::Spawn(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.joins.push((topic.to_string(), params));
        Ok(())
    }

    fn push(&mut self, event: &str, payload: Value) -> Result<()> {
        if self.fail_push {
            return Err(TransportError::Closed);
        }
        self.pushes.push((event.to_string(), payload));
        Ok(())
    }

    fn leave(&mut self) {
        self.leaves += 1;
    }
}
