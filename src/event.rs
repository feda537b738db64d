//! Shared event model for the realtime chat channel.
//!
//! Every message on the wire is an [`Envelope`]: a named event plus a JSON
//! payload, encoded as JSON text in both directions. The client emits
//! `chat_message` events carrying the raw draft text and receives
//! `chat_response` events carrying an object with a `message` field.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name for outbound messages typed by the user.
pub const EVENT_CHAT_MESSAGE: &str = "chat_message";

/// Event name for inbound messages from the chat server.
pub const EVENT_CHAT_RESPONSE: &str = "chat_response";

/// Payload key carrying the message text on inbound events.
pub const DATA_MESSAGE: &str = "message";

/// Error returned by [`decode_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text could not be decoded as an event envelope.
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single named event on the chat channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, e.g. `"chat_message"`.
    pub event: String,
    /// Arbitrary JSON payload.
    pub data: Value,
}

impl Envelope {
    /// Create an outbound `chat_message` event. The payload is the raw draft
    /// text, untrimmed.
    #[must_use]
    pub fn chat_message(text: impl Into<String>) -> Self {
        Self {
            event: EVENT_CHAT_MESSAGE.to_owned(),
            data: Value::String(text.into()),
        }
    }

    /// Create an inbound `chat_response` event carrying one message.
    #[must_use]
    pub fn chat_response(message: impl Into<String>) -> Self {
        let mut data = serde_json::Map::new();
        data.insert(DATA_MESSAGE.to_owned(), Value::String(message.into()));
        Self {
            event: EVENT_CHAT_RESPONSE.to_owned(),
            data: Value::Object(data),
        }
    }

    /// Extract the string `message` field from the payload, if present.
    /// All other payload fields are ignored.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.data.get(DATA_MESSAGE).and_then(Value::as_str)
    }
}

/// Encode an event into JSON text.
///
/// # Panics
///
/// Never panics in practice; an envelope has no unserializable content, so
/// the fallback to an empty string is unreachable.
#[must_use]
pub fn encode_event(event: &Envelope) -> String {
    serde_json::to_string(event).unwrap_or_default()
}

/// Decode JSON text into an event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed text or text that does not
/// match the envelope shape.
pub fn decode_event(text: &str) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_str(text)?)
}
