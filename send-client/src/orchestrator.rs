//! SendSession - the negotiation orchestrator.
//!
//! This module provides [`SendSession`], the top-level coordinator for
//! one publish-and-share operation.
//!
//! # Architecture
//!
//! ```text
//! Application -> SendSession -> SignalConnector -> relay
//!                    |
//!                    +-> MetadataPublisher (transfer id + receive link)
//!                    +-> SessionRegistry (send-core, pure)
//!                    +-> RecipientSession per recipient
//!                          +-> PeerTransport (delegated handshake)
//! ```
//!
//! The coordination channel (role `offerer`) only learns about new
//! recipients. Each admission opens a dedicated channel (role `sender`),
//! registers a session, transmits the offer, and drains that channel in
//! its own task. Admissions interleave freely: an admission suspended on
//! channel-open never blocks the coordination loop or other admissions.
//!
//! All shared state (registry, admitted set, open channels) is owned by
//! the session instance and mutated behind `tokio::sync::Mutex`, never
//! through module globals.

use chrono::Utc;
use send_core::{receive_link, HandshakeState, LinkError, SessionRegistry};
use send_types::{
    EncryptedPayload, PeerAddr, SignalEnvelope, SignalMessage, Transfer, TransferId,
    TransferRequest,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SendConfig;
use crate::peer::{PeerError, PeerTransportFactory};
use crate::publish::{MetadataPublisher, PublishError};
use crate::session::RecipientSession;
use crate::signal::{ChannelError, ChannelRole, SignalChannel, SignalConnector};

/// Errors fatal to the whole send operation.
///
/// Per-recipient failures never surface here: they are contained at the
/// admission/session boundary and logged.
#[derive(Debug, Error)]
pub enum SendError {
    /// The metadata publish call failed; no link is produced.
    #[error("metadata publish failed: {0}")]
    Publish(#[from] PublishError),

    /// The coordination channel could not be opened.
    #[error("coordination channel failed: {0}")]
    Coordination(#[source] ChannelError),

    /// The receive link could not be built from the share origin.
    #[error("receive link construction failed: {0}")]
    Link(#[from] LinkError),

    /// run() was called before a successful publish().
    #[error("transfer not published")]
    NotPublished,
}

/// Errors fatal to a single recipient's admission.
#[derive(Debug, Error)]
enum AdmissionError {
    #[error("transfer not published")]
    NotPublished,

    #[error("relay channel open timed out")]
    OpenTimeout,

    #[error("relay channel failed: {0}")]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Registry(#[from] send_core::RegistryError),

    #[error("offer failed: {0}")]
    Offer(#[from] PeerError),
}

/// The negotiation orchestrator for one transfer.
///
/// Owns the session registry and every signaling channel for the
/// lifetime of the sharing session. Construct it, [`publish`] the
/// payload metadata to obtain the shareable link, then [`run`] the
/// coordination loop until the relay channel closes.
///
/// [`publish`]: SendSession::publish
/// [`run`]: SendSession::run
pub struct SendSession<C, P, F> {
    config: SendConfig,
    connector: C,
    publisher: P,
    peers: F,
    registry: Arc<Mutex<SessionRegistry<Arc<RecipientSession>>>>,
    admitted: Mutex<HashSet<PeerAddr>>,
    transfer: Mutex<Option<Transfer>>,
    payload: Mutex<Option<Arc<EncryptedPayload>>>,
    channels: Mutex<Vec<Arc<dyn SignalChannel>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C, P, F> SendSession<C, P, F>
where
    C: SignalConnector + 'static,
    P: MetadataPublisher + 'static,
    F: PeerTransportFactory + 'static,
{
    /// Create a session from its collaborators.
    pub fn new(config: SendConfig, connector: C, publisher: P, peers: F) -> Self {
        Self {
            config,
            connector,
            publisher,
            peers,
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            admitted: Mutex::new(HashSet::new()),
            transfer: Mutex::new(None),
            payload: Mutex::new(None),
            channels: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Publish the transfer metadata and return the shareable link.
    ///
    /// The link is handed back before any recipient has connected. A
    /// failed publish is fatal: no link is ever produced.
    pub async fn publish(&self, payload: EncryptedPayload) -> Result<Url, SendError> {
        let valid_until = Utc::now() + chrono::Duration::seconds(self.config.valid_for_secs);
        let request = TransferRequest::for_payload(&payload, valid_until);
        let receipt = self.publisher.publish(&request).await?;

        let transfer = Transfer::from_receipt(receipt, &request);
        let link = receive_link(&self.config.share_origin, &transfer.id)?;
        info!(
            transfer_id = %transfer.id,
            file = %transfer.file_name,
            bytes = transfer.content_length_bytes,
            "transfer published"
        );

        *self.transfer.lock().await = Some(transfer);
        *self.payload.lock().await = Some(Arc::new(payload));
        Ok(link)
    }

    /// The published transfer record, if any.
    pub async fn transfer(&self) -> Option<Transfer> {
        self.transfer.lock().await.clone()
    }

    /// Snapshot of every registered session's address and state.
    pub async fn session_states(&self) -> Vec<(PeerAddr, HandshakeState)> {
        let registry = self.registry.lock().await;
        let mut states = Vec::with_capacity(registry.len());
        for (address, session) in registry.iter() {
            states.push((address.clone(), session.state().await));
        }
        states
    }

    /// Open the coordination channel and dispatch until it closes.
    ///
    /// Requires a prior successful [`publish`](SendSession::publish).
    /// Every message other than NEW_RECIPIENT is reported and skipped;
    /// one anomalous message never stops the loop.
    pub async fn run(self: Arc<Self>) -> Result<(), SendError> {
        let transfer_id = {
            let transfer = self.transfer.lock().await;
            transfer
                .as_ref()
                .ok_or(SendError::NotPublished)?
                .id
                .clone()
        };

        let coordination = self
            .connector
            .open(ChannelRole::Offerer, &transfer_id)
            .await
            .map_err(SendError::Coordination)?;
        self.channels.lock().await.push(Arc::clone(&coordination));
        info!(%transfer_id, "coordination channel open; waiting for recipients");

        loop {
            let envelope = match coordination.recv().await {
                Ok(envelope) => envelope,
                Err(ChannelError::Closed) => {
                    debug!("coordination channel closed");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "coordination channel receive failed");
                    break;
                }
            };

            match envelope.open() {
                Ok(SignalMessage::NewRecipient) => {
                    let address = envelope.sender;
                    {
                        // Checked synchronously, before any suspension:
                        // admission is triggered once per distinct address.
                        let mut admitted = self.admitted.lock().await;
                        if !admitted.insert(address.clone()) {
                            warn!(peer = %address, "duplicate NEW_RECIPIENT for admitted address");
                            continue;
                        }
                    }
                    info!(peer = %address, "new recipient connected");

                    let hub = Arc::clone(&self);
                    let id = transfer_id.clone();
                    let handle = tokio::spawn(hub.admit(address, id));
                    self.tasks.lock().await.push(handle);
                }
                Ok(other) => {
                    warn!(
                        sender = %envelope.sender,
                        message = other.token(),
                        "unexpected message type on coordination channel"
                    );
                }
                Err(err) => {
                    warn!(
                        sender = %envelope.sender,
                        error = %err,
                        "undecodable message on coordination channel"
                    );
                }
            }
        }

        self.drain_tasks().await;
        Ok(())
    }

    /// Close the coordination channel and every per-recipient channel.
    pub async fn shutdown(&self) {
        let channels: Vec<_> = self.channels.lock().await.drain(..).collect();
        for channel in channels {
            channel.close().await.ok();
        }
    }

    /// Admit one recipient; failures are contained here.
    async fn admit(self: Arc<Self>, address: PeerAddr, transfer_id: TransferId) {
        if let Err(err) = Arc::clone(&self).try_admit(address.clone(), transfer_id).await {
            warn!(peer = %address, error = %err, "recipient admission failed");
            // Discard any partial registration. Other admissions and the
            // coordination loop are unaffected.
            self.registry.lock().await.remove(&address);
        }
    }

    async fn try_admit(
        self: Arc<Self>,
        address: PeerAddr,
        transfer_id: TransferId,
    ) -> Result<(), AdmissionError> {
        let payload = self
            .payload
            .lock()
            .await
            .clone()
            .ok_or(AdmissionError::NotPublished)?;

        // Open the per-recipient channel and suspend until it is
        // established, bounded so a socket that never completes cannot
        // pin the admission forever.
        let channel = tokio::time::timeout(
            self.config.admission_timeout,
            self.connector.open(ChannelRole::Sender, &transfer_id),
        )
        .await
        .map_err(|_| AdmissionError::OpenTimeout)??;
        self.channels.lock().await.push(Arc::clone(&channel));

        let transport = self.peers.open_transport(&payload);
        let session = RecipientSession::new(address.clone(), transport, Arc::clone(&channel));

        // Register before generating the offer, so a handshake response
        // arriving right after the offer can always be routed.
        self.registry
            .lock()
            .await
            .register(address.clone(), Arc::clone(&session))?;

        session.send_offer().await?;
        debug!(peer = %address, "offer sent");

        session.spawn_ready_watch(self.config.handshake_timeout);
        let hub = Arc::clone(&self);
        let handle = tokio::spawn(hub.recipient_loop(channel));
        self.tasks.lock().await.push(handle);
        Ok(())
    }

    /// Drain one recipient's channel, routing handshake messages through
    /// the registry.
    async fn recipient_loop(self: Arc<Self>, channel: Arc<dyn SignalChannel>) {
        loop {
            let envelope = match channel.recv().await {
                Ok(envelope) => envelope,
                Err(ChannelError::Closed) => break,
                Err(err) => {
                    warn!(error = %err, "recipient channel receive failed");
                    break;
                }
            };
            self.route(envelope).await;
        }
    }

    /// Route one inbound envelope to the session registered for its
    /// sender. Anomalies are reported and the caller keeps processing
    /// subsequent messages.
    async fn route(&self, envelope: SignalEnvelope) {
        let message = match envelope.open() {
            Ok(message) => message,
            Err(err) => {
                warn!(
                    sender = %envelope.sender,
                    error = %err,
                    "undecodable message on recipient channel"
                );
                return;
            }
        };

        let session = {
            let registry = self.registry.lock().await;
            match registry.lookup(&envelope.sender) {
                Ok(session) => Arc::clone(session),
                Err(err) => {
                    warn!(
                        error = %err,
                        message = message.token(),
                        "routing error: message for unregistered address"
                    );
                    return;
                }
            }
        };

        match message {
            SignalMessage::NewAnswer { answer } => session.handle_answer(answer).await,
            SignalMessage::NewIceCandidate { candidate } => {
                session.handle_candidate(candidate).await
            }
            other => {
                warn!(
                    sender = %envelope.sender,
                    message = other.token(),
                    "unexpected message type on recipient channel"
                );
            }
        }
    }

    /// Join admission and recipient-loop tasks spawned so far.
    async fn drain_tasks(&self) {
        loop {
            let handle = self.tasks.lock().await.pop();
            match handle {
                Some(handle) => {
                    handle.await.ok();
                }
                None => break,
            }
        }
    }
}
