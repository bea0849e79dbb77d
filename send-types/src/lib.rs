//! # send-types
//!
//! Wire format types for the 0k-Send direct transfer signaling protocol.
//!
//! This crate provides the foundational types used across all 0k-Send crates:
//! - [`PeerAddr`], [`TransferId`] - Relay-minted identifiers
//! - [`SignalMessage`] - Signaling messages (offer, answer, candidates)
//! - [`SignalEnvelope`] - Relay message wrapper with sender routing
//! - [`Transfer`], [`TransferRequest`], [`TransferReceipt`] - Published metadata
//! - [`SignalError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod signal;
mod transfer;

pub use envelope::SignalEnvelope;
pub use error::SignalError;
pub use ids::{PeerAddr, TransferId};
pub use signal::{IceCandidate, SessionDescription, SignalMessage};
pub use transfer::{EncryptedPayload, KeyMaterial, Transfer, TransferReceipt, TransferRequest};
