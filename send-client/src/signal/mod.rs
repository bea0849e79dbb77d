//! Signaling channel abstraction for 0k-Send.
//!
//! This module provides a pluggable channel layer over the relay
//! connection (WebSocket in production, mock for testing).
//!
//! # Design
//!
//! A channel is connection-oriented and scoped to one transfer:
//! - a [`SignalConnector`] opens channels; `open()` resolves only once
//!   the connection is established, so awaiting it is the suspension
//!   point before the first send
//! - `send()` transmits one bare [`SignalMessage`] (the relay wraps
//!   outbound messages with the sender address itself)
//! - `recv()` yields inbound [`SignalEnvelope`]s in relay order
//! - `close()` terminates the channel
//!
//! Ordering holds per channel only; nothing is guaranteed across
//! channels.

mod mock;
mod ws;

pub use mock::{MockChannel, MockConnector};
pub use ws::{WsChannel, WsConnector};

use async_trait::async_trait;
use send_types::{SignalEnvelope, SignalMessage, TransferId};
use std::sync::Arc;
use thiserror::Error;

/// Role a channel is opened with, carried as the `role` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Coordination channel; receives NEW_RECIPIENT notifications.
    Offerer,
    /// Per-recipient channel; exchanges handshake messages with one
    /// recipient.
    Sender,
}

impl ChannelRole {
    /// The query parameter value for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelRole::Offerer => "offerer",
            ChannelRole::Sender => "sender",
        }
    }
}

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed.
    #[error("connection closed")]
    Closed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// A relay signaling channel scoped to one transfer.
#[async_trait]
pub trait SignalChannel: Send + Sync {
    /// Send one signaling message.
    async fn send(&self, message: &SignalMessage) -> Result<(), ChannelError>;

    /// Receive the next inbound envelope.
    ///
    /// Returns [`ChannelError::Closed`] once the channel is finished.
    async fn recv(&self) -> Result<SignalEnvelope, ChannelError>;

    /// Close the channel.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens signaling channels against the relay.
#[async_trait]
pub trait SignalConnector: Send + Sync {
    /// Open a channel with the given role for a transfer.
    ///
    /// Resolves once the connection is established.
    async fn open(
        &self,
        role: ChannelRole,
        transfer_id: &TransferId,
    ) -> Result<Arc<dyn SignalChannel>, ChannelError>;
}
