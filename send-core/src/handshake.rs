//! Recipient handshake state machine for 0k-Send.
//!
//! This module provides a pure, side-effect-free state machine for one
//! recipient's negotiation lifecycle. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (transmitting the offer, invoking the peer transport
//! primitives) is performed by send-client, not by this module. This
//! enables instant unit testing without network mocks.

use send_types::{IceCandidate, SessionDescription};

/// Handshake state machine - NO I/O, just state transitions.
///
/// Readiness is signaled by the external peer transport collaborator via
/// [`HandshakeEvent::TransportReady`]; the state machine never infers it
/// from envelope content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// Session constructed, no offer generated yet.
    Created,
    /// Offer generated and transmitted; waiting for the answer.
    OfferSent,
    /// Remote answer applied; waiting for candidates or readiness.
    AnswerReceived,
    /// At least one candidate forwarded; still converging.
    NegotiatingCandidates,
    /// Direct transport usable; handed off to the bulk transfer.
    Ready,
    /// Terminal failure. Absorbs all further events.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl HandshakeState {
    /// Create a new state machine in the Created state.
    pub fn new() -> Self {
        Self::Created
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function. The caller (send-client) is responsible
    /// for executing the returned actions.
    pub fn on_event(self, event: HandshakeEvent) -> (Self, Vec<HandshakeAction>) {
        match (self, event) {
            // From Created
            (Self::Created, HandshakeEvent::OfferReady { offer }) => (
                Self::OfferSent,
                vec![HandshakeAction::TransmitOffer { offer }],
            ),
            (Self::Created, HandshakeEvent::OfferFailed { error }) => (
                Self::Failed {
                    reason: error.clone(),
                },
                vec![HandshakeAction::ReportFailure { reason: error }],
            ),

            // From OfferSent. A second OfferReady is absorbed below: the
            // offer is generated at most once per session.
            (Self::OfferSent, HandshakeEvent::AnswerArrived { answer }) => (
                Self::AnswerReceived,
                vec![HandshakeAction::ApplyAnswer { answer }],
            ),

            // Candidate exchange. Arrival order is preserved because each
            // event produces its action synchronously.
            (
                Self::AnswerReceived | Self::NegotiatingCandidates,
                HandshakeEvent::CandidateArrived { candidate },
            ) => (
                Self::NegotiatingCandidates,
                vec![HandshakeAction::ApplyCandidate { candidate }],
            ),

            // Readiness, signaled by the peer transport collaborator.
            (
                Self::AnswerReceived | Self::NegotiatingCandidates,
                HandshakeEvent::TransportReady,
            ) => (Self::Ready, vec![HandshakeAction::HandOff]),

            // A delegated primitive failing poisons only this session.
            (
                Self::Created | Self::OfferSent | Self::AnswerReceived | Self::NegotiatingCandidates,
                HandshakeEvent::PrimitiveFailed { error },
            ) => (
                Self::Failed {
                    reason: error.clone(),
                },
                vec![HandshakeAction::ReportFailure { reason: error }],
            ),

            // Invalid or late events - stay in current state. This covers
            // terminal-state absorption (Failed and Ready sessions stop
            // consuming messages gracefully), the offer idempotence rule,
            // and candidates arriving before the answer.
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the handshake reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed { .. })
    }

    /// Check if the direct transport is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the session failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl Default for HandshakeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in one recipient's negotiation lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// The offer was generated by the peer transport.
    OfferReady {
        /// The generated offer.
        offer: SessionDescription,
    },
    /// Offer generation failed.
    OfferFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// A NEW_ANSWER envelope arrived for this session.
    AnswerArrived {
        /// The recipient's answer.
        answer: SessionDescription,
    },
    /// A NEW_ICE_CANDIDATE envelope arrived for this session.
    CandidateArrived {
        /// The connectivity candidate.
        candidate: IceCandidate,
    },
    /// The peer transport reported the direct channel usable.
    TransportReady,
    /// A delegated primitive failed (malformed answer or candidate,
    /// transmit failure, handshake timeout).
    PrimitiveFailed {
        /// Error message describing the failure.
        error: String,
    },
}

/// Actions to be executed by send-client.
///
/// These are instructions, not side effects. The client interprets them
/// and performs the actual I/O against the signaling channel and the peer
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Transmit the offer over the per-recipient channel.
    TransmitOffer {
        /// The offer to transmit.
        offer: SessionDescription,
    },
    /// Apply the remote answer to the peer transport.
    ApplyAnswer {
        /// The answer to apply.
        answer: SessionDescription,
    },
    /// Forward a candidate to the peer transport.
    ApplyCandidate {
        /// The candidate to forward.
        candidate: IceCandidate,
    },
    /// Hand the session off to the bulk transfer collaborator.
    HandOff,
    /// Report a session failure.
    ReportFailure {
        /// What went wrong.
        reason: String,
    },
}
