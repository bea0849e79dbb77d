//! Per-recipient session.
//!
//! One [`RecipientSession`] per admitted recipient. The session owns the
//! peer transport handle and its per-recipient signaling channel, and
//! interprets the actions produced by the pure state machine in
//! send-core: transmitting the offer, applying answers and candidates,
//! and reporting failures. A failed primitive moves only this session to
//! `Failed`; it never tears down the channel or touches other sessions.

use send_core::{HandshakeAction, HandshakeEvent, HandshakeState};
use send_types::{IceCandidate, PeerAddr, SessionDescription, SignalMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::peer::{PeerError, PeerTransport};
use crate::signal::SignalChannel;

/// One recipient's negotiation session.
pub struct RecipientSession {
    address: PeerAddr,
    transport: Arc<dyn PeerTransport>,
    channel: Arc<dyn SignalChannel>,
    state: Mutex<HandshakeState>,
}

impl RecipientSession {
    /// Create a session bound to its transport and signaling channel.
    pub fn new(
        address: PeerAddr,
        transport: Arc<dyn PeerTransport>,
        channel: Arc<dyn SignalChannel>,
    ) -> Arc<Self> {
        Arc::new(Self {
            address,
            transport,
            channel,
            state: Mutex::new(HandshakeState::new()),
        })
    }

    /// The recipient's relay address.
    pub fn address(&self) -> &PeerAddr {
        &self.address
    }

    /// Snapshot of the current handshake state.
    pub async fn state(&self) -> HandshakeState {
        self.state.lock().await.clone()
    }

    /// Generate and transmit the offer.
    ///
    /// Generates at most once per session: a repeat call after the
    /// session left `Created` is a no-op.
    pub async fn send_offer(&self) -> Result<(), PeerError> {
        if !matches!(*self.state.lock().await, HandshakeState::Created) {
            debug!(peer = %self.address, "offer already generated; skipping");
            return Ok(());
        }

        match self.transport.create_offer().await {
            Ok(offer) => {
                self.apply_event(HandshakeEvent::OfferReady { offer }).await;
                Ok(())
            }
            Err(err) => {
                self.apply_event(HandshakeEvent::OfferFailed {
                    error: err.to_string(),
                })
                .await;
                Err(err)
            }
        }
    }

    /// Handle an inbound NEW_ANSWER for this session.
    pub async fn handle_answer(&self, answer: SessionDescription) {
        self.apply_event(HandshakeEvent::AnswerArrived { answer })
            .await;
    }

    /// Handle an inbound NEW_ICE_CANDIDATE for this session.
    pub async fn handle_candidate(&self, candidate: IceCandidate) {
        self.apply_event(HandshakeEvent::CandidateArrived { candidate })
            .await;
    }

    /// Watch the peer transport for readiness, bounded by `timeout`.
    ///
    /// On readiness the session reaches `Ready` and is handed off; on
    /// transport failure it fails in place; on timeout it fails and its
    /// channel is closed. The handle is detached by callers: the task
    /// ends on its own once one of the three outcomes fires.
    pub fn spawn_ready_watch(self: &Arc<Self>, timeout: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, session.transport.wait_ready()).await {
                Ok(Ok(())) => {
                    session.apply_event(HandshakeEvent::TransportReady).await;
                }
                Ok(Err(err)) => {
                    session
                        .apply_event(HandshakeEvent::PrimitiveFailed {
                            error: err.to_string(),
                        })
                        .await;
                }
                Err(_) => {
                    session
                        .apply_event(HandshakeEvent::PrimitiveFailed {
                            error: format!("handshake timed out after {timeout:?}"),
                        })
                        .await;
                    session.channel.close().await.ok();
                }
            }
        })
    }

    /// Drive the state machine and execute the actions it produces.
    ///
    /// A failing action is fed back as `PrimitiveFailed`, which the
    /// machine absorbs once the session is already terminal.
    async fn apply_event(&self, event: HandshakeEvent) {
        let mut pending = Some(event);
        while let Some(event) = pending.take() {
            let actions = {
                let mut state = self.state.lock().await;
                let (next, actions) = state.clone().on_event(event);
                *state = next;
                actions
            };

            for action in actions {
                if let Err(error) = self.perform(action).await {
                    warn!(peer = %self.address, %error, "handshake step failed");
                    pending = Some(HandshakeEvent::PrimitiveFailed { error });
                    break;
                }
            }
        }
    }

    async fn perform(&self, action: HandshakeAction) -> Result<(), String> {
        match action {
            HandshakeAction::TransmitOffer { offer } => self
                .channel
                .send(&SignalMessage::NewOffer { offer })
                .await
                .map_err(|e| e.to_string()),
            HandshakeAction::ApplyAnswer { answer } => self
                .transport
                .apply_answer(answer)
                .await
                .map_err(|e| e.to_string()),
            HandshakeAction::ApplyCandidate { candidate } => self
                .transport
                .add_remote_candidate(candidate)
                .await
                .map_err(|e| e.to_string()),
            HandshakeAction::HandOff => {
                info!(peer = %self.address, "direct transport ready; handing off to bulk transfer");
                Ok(())
            }
            HandshakeAction::ReportFailure { reason } => {
                warn!(peer = %self.address, %reason, "recipient session failed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::MockPeerTransport;
    use crate::signal::MockChannel;
    use send_core::HandshakeState;

    fn session_with_mocks() -> (
        Arc<RecipientSession>,
        Arc<MockPeerTransport>,
        Arc<MockChannel>,
    ) {
        let transport = MockPeerTransport::new();
        let channel = MockChannel::new();
        let session = RecipientSession::new(
            PeerAddr::new("peerA"),
            transport.clone() as Arc<dyn PeerTransport>,
            channel.clone() as Arc<dyn SignalChannel>,
        );
        (session, transport, channel)
    }

    // ===========================================
    // Offer Generation
    // ===========================================

    #[tokio::test]
    async fn send_offer_transmits_and_advances_state() {
        let (session, transport, channel) = session_with_mocks();
        transport.set_offer("v=0 my offer");

        session.send_offer().await.unwrap();

        assert_eq!(session.state().await, HandshakeState::OfferSent);
        let sent = channel.sent_messages();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            SignalMessage::NewOffer { offer } => assert_eq!(offer.sdp, "v=0 my offer"),
            other => panic!("expected NewOffer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn offer_is_generated_at_most_once() {
        let (session, transport, channel) = session_with_mocks();

        session.send_offer().await.unwrap();
        session.send_offer().await.unwrap();

        assert_eq!(transport.offer_calls(), 1);
        assert_eq!(channel.sent_count("NEW_OFFER"), 1);
    }

    #[tokio::test]
    async fn offer_generation_failure_fails_session() {
        let (session, transport, channel) = session_with_mocks();
        transport.fail_offer("no transport");

        let result = session.send_offer().await;
        assert!(result.is_err());
        assert!(session.state().await.is_failed());
        assert!(channel.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn offer_transmit_failure_fails_session_without_propagating() {
        let (session, _transport, channel) = session_with_mocks();
        channel.fail_next_send("socket gone");

        // The transmit failure is contained in the session.
        session.send_offer().await.unwrap();
        assert!(session.state().await.is_failed());
    }

    // ===========================================
    // Answer and Candidate Handling
    // ===========================================

    #[tokio::test]
    async fn answer_advances_state_and_reaches_transport() {
        let (session, transport, _channel) = session_with_mocks();
        session.send_offer().await.unwrap();

        session
            .handle_answer(SessionDescription::answer("v=0 their answer"))
            .await;

        assert_eq!(session.state().await, HandshakeState::AnswerReceived);
        let answers = transport.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].sdp, "v=0 their answer");
    }

    #[tokio::test]
    async fn candidates_forwarded_in_arrival_order() {
        let (session, transport, _channel) = session_with_mocks();
        session.send_offer().await.unwrap();
        session
            .handle_answer(SessionDescription::answer("a"))
            .await;

        session.handle_candidate(IceCandidate::new("c1")).await;
        session.handle_candidate(IceCandidate::new("c2")).await;

        assert_eq!(
            session.state().await,
            HandshakeState::NegotiatingCandidates
        );
        let candidates: Vec<String> = transport
            .candidates()
            .into_iter()
            .map(|c| c.candidate)
            .collect();
        assert_eq!(candidates, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn malformed_answer_fails_only_this_session() {
        let (session, transport, channel) = session_with_mocks();
        session.send_offer().await.unwrap();
        transport.fail_answer("bad sdp");

        session
            .handle_answer(SessionDescription::answer("garbage"))
            .await;

        assert!(session.state().await.is_failed());
        // The channel stays open: a failed session absorbs further
        // traffic instead of tearing anything down.
        assert!(!channel.is_closed());

        session.handle_candidate(IceCandidate::new("late")).await;
        assert!(transport.candidates().is_empty());
        assert!(session.state().await.is_failed());
    }

    #[tokio::test]
    async fn candidate_before_answer_is_ignored() {
        let (session, transport, _channel) = session_with_mocks();
        session.send_offer().await.unwrap();

        session.handle_candidate(IceCandidate::new("early")).await;

        assert_eq!(session.state().await, HandshakeState::OfferSent);
        assert!(transport.candidates().is_empty());
    }

    // ===========================================
    // Readiness Watch
    // ===========================================

    #[tokio::test]
    async fn ready_watch_completes_handshake() {
        let (session, transport, _channel) = session_with_mocks();
        session.send_offer().await.unwrap();
        session
            .handle_answer(SessionDescription::answer("a"))
            .await;

        let watch = session.spawn_ready_watch(Duration::from_secs(5));
        transport.complete_ready();
        watch.await.unwrap();

        assert!(session.state().await.is_ready());
    }

    #[tokio::test]
    async fn ready_watch_failure_fails_session() {
        let (session, transport, channel) = session_with_mocks();
        session.send_offer().await.unwrap();

        let watch = session.spawn_ready_watch(Duration::from_secs(5));
        transport.fail_ready("dtls failure");
        watch.await.unwrap();

        assert!(session.state().await.is_failed());
        assert!(!channel.is_closed());
    }

    #[tokio::test]
    async fn ready_watch_timeout_fails_session_and_closes_channel() {
        let (session, _transport, channel) = session_with_mocks();
        session.send_offer().await.unwrap();

        let watch = session.spawn_ready_watch(Duration::from_millis(20));
        watch.await.unwrap();

        assert!(session.state().await.is_failed());
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn readiness_without_answer_is_absorbed() {
        // TransportReady in OfferSent is not a defined transition; the
        // machine stays put rather than inventing readiness.
        let (session, transport, _channel) = session_with_mocks();
        session.send_offer().await.unwrap();

        let watch = session.spawn_ready_watch(Duration::from_secs(5));
        transport.complete_ready();
        watch.await.unwrap();

        assert_eq!(session.state().await, HandshakeState::OfferSent);
    }
}
