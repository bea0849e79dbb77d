//! Error types for 0k-Send wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding signaling traffic.
#[derive(Debug, Error)]
pub enum SignalError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Message carried a type token outside the closed set
    #[error("unsupported message type: {token}")]
    UnsupportedType {
        /// The unrecognized type token as it appeared on the wire.
        token: String,
    },

    /// Key material was not valid base64
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(#[source] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SignalError::UnsupportedType {
            token: "BOGUS".into(),
        };
        assert_eq!(err.to_string(), "unsupported message type: BOGUS");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignalError>();
    }
}
