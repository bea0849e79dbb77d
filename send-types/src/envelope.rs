//! SignalEnvelope - the relay message wrapper.
//!
//! The relay wraps every routed message in `{ sender, body }`, where
//! `body` is itself a JSON-encoded [`SignalMessage`]. The double encoding
//! is part of the relay contract. Envelopes are transient: they exist
//! only for the handling of a single inbound event.

use serde::{Deserialize, Serialize};

use crate::{PeerAddr, SignalError, SignalMessage};

/// A relay-routed signaling message with its sender address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    /// Relay-minted address of the endpoint that sent the body.
    pub sender: PeerAddr,
    /// JSON-encoded [`SignalMessage`].
    pub body: String,
}

impl SignalEnvelope {
    /// Wrap a message for the given sender.
    pub fn seal(sender: PeerAddr, message: &SignalMessage) -> Result<Self, SignalError> {
        Ok(Self {
            sender,
            body: message.to_json()?,
        })
    }

    /// Decode the inner message.
    ///
    /// An unknown type token surfaces as [`SignalError::UnsupportedType`];
    /// malformed JSON surfaces as [`SignalError::Deserialization`]. Either
    /// way the envelope itself stays intact, so the caller can report the
    /// anomaly and keep processing subsequent envelopes.
    pub fn open(&self) -> Result<SignalMessage, SignalError> {
        SignalMessage::from_json(&self.body)
    }

    /// Serialize the envelope to a JSON string.
    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string(self).map_err(SignalError::Serialization)
    }

    /// Deserialize an envelope from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, SignalError> {
        serde_json::from_str(raw).map_err(SignalError::Deserialization)
    }
}
