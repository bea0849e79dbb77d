//! # send-client
//!
//! Sender-side negotiation orchestrator for 0k-Send.
//!
//! This is the library applications use to share an encrypted file with
//! recipients over direct transports, negotiated through a relay.
//!
//! ## Features
//!
//! - **Relay Signaling**: WebSocket channels in offerer and sender roles
//! - **Per-Recipient Sessions**: one state machine per recipient, tracked
//!   in an explicit registry
//! - **Trait Seams**: pluggable signaling channels, metadata publisher and
//!   peer transport, each with a mock for testing
//! - **Pure State Machine**: uses send-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use send_client::{SendConfig, SendSession, WsConnector, HttpPublisher};
//!
//! let config = SendConfig::new(signal_url, api_url, share_origin);
//! let session = Arc::new(SendSession::new(config, connector, publisher, peers));
//!
//! // Publish metadata and get the shareable link
//! let link = session.publish(encrypted_payload).await?;
//!
//! // Drive recipient negotiations until the relay channel closes
//! session.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod orchestrator;
pub mod peer;
pub mod publish;
pub mod session;
pub mod signal;

pub use config::SendConfig;
pub use orchestrator::{SendError, SendSession};
pub use peer::{MockPeerFactory, MockPeerTransport, PeerError, PeerTransport, PeerTransportFactory};
pub use publish::{HttpPublisher, MetadataPublisher, MockPublisher, PublishError};
pub use session::RecipientSession;
pub use signal::{
    ChannelError, ChannelRole, MockChannel, MockConnector, SignalChannel, SignalConnector,
    WsConnector,
};
