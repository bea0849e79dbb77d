//! Transfer metadata and payload reference types.
//!
//! A [`Transfer`] identifies one publish-and-share operation. The
//! orchestrator publishes a [`TransferRequest`] to the metadata service,
//! receives a [`TransferReceipt`], and keeps the resulting [`Transfer`]
//! for the life of the sharing session. Nothing here is persisted.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::{SignalError, TransferId};

/// Exported symmetric key material, base64 on the wire.
///
/// Key generation and encryption are owned by the crypto collaborator;
/// this type only carries the exported bytes to the metadata service.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Wrap exported key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode key material from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, SignalError> {
        STANDARD
            .decode(encoded)
            .map(Self)
            .map_err(SignalError::InvalidKeyMaterial)
    }

    /// The raw exported bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode as base64 for the publish request.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

// Intentionally opaque debug to avoid logging key material
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED])")
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// The already-encrypted payload the orchestrator is handed.
///
/// Produced by the crypto collaborator before negotiation starts. The
/// orchestrator never reads the ciphertext; it only forwards the
/// reference to each recipient's peer transport.
#[derive(Clone)]
pub struct EncryptedPayload {
    ciphertext: Vec<u8>,
    file_name: String,
    key: KeyMaterial,
}

impl EncryptedPayload {
    /// Bundle ciphertext with its file name and exported key.
    pub fn new(ciphertext: Vec<u8>, file_name: impl Into<String>, key: KeyMaterial) -> Self {
        Self {
            ciphertext,
            file_name: file_name.into(),
            key,
        }
    }

    /// The encrypted bytes.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The original file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The exported key material.
    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Ciphertext length in bytes, as published in the metadata.
    pub fn content_length_bytes(&self) -> u64 {
        self.ciphertext.len() as u64
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("file_name", &self.file_name)
            .field(
                "ciphertext",
                &format!("[{} bytes REDACTED]", self.ciphertext.len()),
            )
            .finish_non_exhaustive()
    }
}

/// Metadata publish request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Original file name.
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Ciphertext length in bytes.
    #[serde(rename = "contentLengthBytes")]
    pub content_length_bytes: u64,
    /// Exported key material (base64).
    #[serde(rename = "privateKey")]
    pub private_key: KeyMaterial,
    /// Absolute expiry timestamp (RFC 3339).
    #[serde(rename = "validUntil")]
    pub valid_until: DateTime<Utc>,
}

impl TransferRequest {
    /// Build the publish request for a payload expiring at `valid_until`.
    pub fn for_payload(payload: &EncryptedPayload, valid_until: DateTime<Utc>) -> Self {
        Self {
            file_name: payload.file_name().to_owned(),
            content_length_bytes: payload.content_length_bytes(),
            private_key: payload.key().clone(),
            valid_until,
        }
    }
}

/// Metadata publish response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Server-assigned transfer identifier.
    pub id: TransferId,
}

/// One published publish-and-share operation.
///
/// Immutable after creation; owned by the orchestrator for the lifetime
/// of the sharing session.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Server-assigned identifier.
    pub id: TransferId,
    /// Original file name.
    pub file_name: String,
    /// Ciphertext length in bytes.
    pub content_length_bytes: u64,
    /// Exported key material.
    pub key: KeyMaterial,
    /// Absolute expiry timestamp.
    pub valid_until: DateTime<Utc>,
}

impl Transfer {
    /// Combine a publish receipt with the request it acknowledged.
    pub fn from_receipt(receipt: TransferReceipt, request: &TransferRequest) -> Self {
        Self {
            id: receipt.id,
            file_name: request.file_name.clone(),
            content_length_bytes: request.content_length_bytes,
            key: request.private_key.clone(),
            valid_until: request.valid_until,
        }
    }
}
