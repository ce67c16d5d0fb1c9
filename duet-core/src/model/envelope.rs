use crate::model::signaling::SignalMessage;
use serde::{Deserialize, Serialize};

/// Relay-level message body: `{ "text": "<json>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEnvelope {
    pub text: String,
}

impl TextEnvelope {
    pub fn encode(msg: &SignalMessage) -> Result<Self, serde_json::Error> {
        Ok(Self {
            text: serde_json::to_string(msg)?,
        })
    }

    pub fn decode(&self) -> Result<SignalMessage, serde_json::Error> {
        serde_json::from_str(&self.text)
    }
}
