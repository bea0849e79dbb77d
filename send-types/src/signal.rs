//! Signaling messages for 0k-Send.
//!
//! These are the handshake messages exchanged through the relay while a
//! sender and a recipient negotiate a direct transport. The set of type
//! tokens is closed and case-sensitive; dispatch over [`SignalMessage`]
//! is exhaustiveness-checked at compile time.

use serde::{Deserialize, Serialize};

use crate::SignalError;

/// All signaling messages, tagged by their wire token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalMessage {
    /// A new recipient has connected for this transfer (relay to offerer).
    #[serde(rename = "NEW_RECIPIENT")]
    NewRecipient,
    /// Handshake offer for a specific recipient (sender role to relay).
    #[serde(rename = "NEW_OFFER")]
    NewOffer {
        /// The generated offer description.
        offer: SessionDescription,
    },
    /// Recipient's handshake answer (relay to sender role).
    #[serde(rename = "NEW_ANSWER")]
    NewAnswer {
        /// The recipient's answer description.
        answer: SessionDescription,
    },
    /// One connectivity candidate (either direction).
    #[serde(rename = "NEW_ICE_CANDIDATE")]
    NewIceCandidate {
        /// The connectivity candidate.
        candidate: IceCandidate,
    },
}

impl SignalMessage {
    /// The closed set of wire type tokens.
    pub const KNOWN_TYPES: [&'static str; 4] = [
        "NEW_RECIPIENT",
        "NEW_OFFER",
        "NEW_ANSWER",
        "NEW_ICE_CANDIDATE",
    ];

    /// The wire token of this message.
    pub fn token(&self) -> &'static str {
        match self {
            SignalMessage::NewRecipient => "NEW_RECIPIENT",
            SignalMessage::NewOffer { .. } => "NEW_OFFER",
            SignalMessage::NewAnswer { .. } => "NEW_ANSWER",
            SignalMessage::NewIceCandidate { .. } => "NEW_ICE_CANDIDATE",
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string(self).map_err(SignalError::Serialization)
    }

    /// Deserialize from a JSON string.
    ///
    /// A well-formed message with a type token outside the closed set is
    /// reported as [`SignalError::UnsupportedType`] so callers can treat
    /// it as a protocol anomaly rather than a parse failure.
    pub fn from_json(raw: &str) -> Result<Self, SignalError> {
        match serde_json::from_str::<SignalMessage>(raw) {
            Ok(message) => Ok(message),
            Err(err) => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
                    if let Some(token) = value.get("type").and_then(|t| t.as_str()) {
                        if !Self::KNOWN_TYPES.contains(&token) {
                            return Err(SignalError::UnsupportedType {
                                token: token.to_owned(),
                            });
                        }
                    }
                }
                Err(SignalError::Deserialization(err))
            }
        }
    }
}

/// An offer or answer handshake description.
///
/// The `type` field distinguishes the two ("offer" or "answer"); the `sdp`
/// body is opaque to the orchestrator and consumed only by the peer
/// transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description kind: "offer" or "answer".
    #[serde(rename = "type")]
    pub kind: String,
    /// The session description body.
    pub sdp: String,
}

impl SessionDescription {
    /// Create an offer description.
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    /// Create an answer description.
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

/// One connectivity candidate, in the camelCase shape browsers emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// The candidate attribute line.
    pub candidate: String,
    /// Media stream identification tag, if present.
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    /// Media description index, if present.
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u32>,
    /// ICE username fragment, if present.
    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    /// Create a candidate from its attribute line alone.
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}
