//! Peer transport contract.
//!
//! The handshake primitives (`create_offer`, `apply_answer`,
//! `add_remote_candidate`) and the readiness signal belong to the
//! external transport collaborator that will own the direct channel and
//! the bulk transfer. The orchestrator fully owns *when* these are
//! invoked and on what data, never *how* they work, so they live behind
//! a trait with a scriptable mock.

use async_trait::async_trait;
use send_types::{EncryptedPayload, IceCandidate, SessionDescription};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

/// Peer transport errors.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Offer generation failed.
    #[error("offer generation failed: {0}")]
    Offer(String),

    /// The remote answer was rejected.
    #[error("remote answer rejected: {0}")]
    Answer(String),

    /// The remote candidate was rejected.
    #[error("remote candidate rejected: {0}")]
    Candidate(String),

    /// The transport failed while negotiating.
    #[error("transport failed: {0}")]
    Transport(String),
}

/// The delegated handshake handle for one recipient.
///
/// Readiness is decided by the transport, not by the orchestrator:
/// `wait_ready()` resolves when the direct channel is usable and the
/// bulk transfer may begin.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Generate the handshake offer. May suspend.
    async fn create_offer(&self) -> Result<SessionDescription, PeerError>;

    /// Apply the recipient's answer.
    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), PeerError>;

    /// Forward one connectivity candidate.
    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Resolve once the direct channel is usable.
    async fn wait_ready(&self) -> Result<(), PeerError>;
}

/// Creates one peer transport per admitted recipient, bound to the
/// already-encrypted payload it will eventually deliver.
pub trait PeerTransportFactory: Send + Sync {
    /// Open a transport for one recipient.
    fn open_transport(&self, payload: &Arc<EncryptedPayload>) -> Arc<dyn PeerTransport>;
}

/// Mock peer transport for testing.
///
/// Scripts the generated offer, records applied answers and candidates
/// in arrival order, and lets tests trigger or fail readiness.
#[derive(Debug)]
pub struct MockPeerTransport {
    inner: Mutex<MockPeerInner>,
    ready: Notify,
}

#[derive(Debug)]
struct MockPeerInner {
    offer: SessionDescription,
    offer_calls: u32,
    fail_offer: Option<String>,
    fail_answer: Option<String>,
    fail_candidate: Option<String>,
    answers: Vec<SessionDescription>,
    candidates: Vec<IceCandidate>,
    ready_result: Option<Result<(), String>>,
}

impl Default for MockPeerTransport {
    fn default() -> Self {
        Self {
            inner: Mutex::new(MockPeerInner {
                offer: SessionDescription::offer("v=0 mock offer"),
                offer_calls: 0,
                fail_offer: None,
                fail_answer: None,
                fail_candidate: None,
                answers: Vec::new(),
                candidates: Vec::new(),
                ready_result: None,
            }),
            ready: Notify::new(),
        }
    }
}

impl MockPeerTransport {
    /// Create a new mock transport with a default scripted offer.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the offer returned by create_offer().
    pub fn set_offer(&self, sdp: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.offer = SessionDescription::offer(sdp);
    }

    /// Cause create_offer() to fail with the given error.
    pub fn fail_offer(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_offer = Some(error.to_string());
    }

    /// Cause apply_answer() to fail with the given error.
    pub fn fail_answer(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_answer = Some(error.to_string());
    }

    /// Cause add_remote_candidate() to fail with the given error.
    pub fn fail_candidate(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_candidate = Some(error.to_string());
    }

    /// Signal the direct channel usable; wait_ready() resolves Ok.
    pub fn complete_ready(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ready_result = Some(Ok(()));
        drop(inner);
        self.ready.notify_one();
    }

    /// Signal transport failure; wait_ready() resolves Err.
    pub fn fail_ready(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.ready_result = Some(Err(error.to_string()));
        drop(inner);
        self.ready.notify_one();
    }

    /// How many times create_offer() was invoked.
    pub fn offer_calls(&self) -> u32 {
        self.inner.lock().unwrap().offer_calls
    }

    /// Answers applied so far, in order.
    pub fn answers(&self) -> Vec<SessionDescription> {
        self.inner.lock().unwrap().answers.clone()
    }

    /// Candidates applied so far, in order.
    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.inner.lock().unwrap().candidates.clone()
    }
}

#[async_trait]
impl PeerTransport for MockPeerTransport {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.offer_calls += 1;
        if let Some(error) = inner.fail_offer.take() {
            return Err(PeerError::Offer(error));
        }
        Ok(inner.offer.clone())
    }

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), PeerError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_answer.take() {
            return Err(PeerError::Answer(error));
        }
        inner.answers.push(answer);
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_candidate.take() {
            return Err(PeerError::Candidate(error));
        }
        inner.candidates.push(candidate);
        Ok(())
    }

    async fn wait_ready(&self) -> Result<(), PeerError> {
        loop {
            {
                let inner = self.inner.lock().unwrap();
                if let Some(result) = inner.ready_result.clone() {
                    return result.map_err(PeerError::Transport);
                }
            }
            self.ready.notified().await;
        }
    }
}

/// Mock factory for testing.
///
/// Yields scripted transports in order, falling back to fresh default
/// transports, and records every transport it created.
#[derive(Debug, Default)]
pub struct MockPeerFactory {
    inner: Arc<Mutex<MockPeerFactoryInner>>,
}

#[derive(Debug, Default)]
struct MockPeerFactoryInner {
    scripted: VecDeque<Arc<MockPeerTransport>>,
    created: Vec<Arc<MockPeerTransport>>,
}

impl MockPeerFactory {
    /// Create a new mock factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next open_transport() to yield this transport.
    pub fn queue_transport(&self, transport: Arc<MockPeerTransport>) {
        let mut inner = self.inner.lock().unwrap();
        inner.scripted.push_back(transport);
    }

    /// Every transport created so far, in creation order.
    pub fn created(&self) -> Vec<Arc<MockPeerTransport>> {
        let inner = self.inner.lock().unwrap();
        inner.created.clone()
    }
}

impl Clone for MockPeerFactory {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PeerTransportFactory for MockPeerFactory {
    fn open_transport(&self, _payload: &Arc<EncryptedPayload>) -> Arc<dyn PeerTransport> {
        let mut inner = self.inner.lock().unwrap();
        let transport = inner
            .scripted
            .pop_front()
            .unwrap_or_else(MockPeerTransport::new);
        inner.created.push(Arc::clone(&transport));
        transport
    }
}
