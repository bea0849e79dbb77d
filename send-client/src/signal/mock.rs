//! Mock signaling channels for testing.
//!
//! Allows queueing inbound envelopes and capturing sent messages for
//! verification, plus scripting channel-open outcomes on the connector.

use super::{ChannelError, ChannelRole, SignalChannel, SignalConnector};
use async_trait::async_trait;
use send_types::{SignalEnvelope, SignalMessage, TransferId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock signaling channel.
///
/// Inbound envelopes are queued by the test; once the queue is drained
/// `recv()` reports the channel closed. Sent messages are captured for
/// verification.
#[derive(Debug, Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug, Default)]
struct MockChannelInner {
    receive_queue: VecDeque<SignalEnvelope>,
    sent_messages: Vec<SignalMessage>,
    fail_next_send: Option<String>,
    open_delay: Option<Duration>,
    closed: bool,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an envelope to be returned by a later `recv()` call.
    pub fn queue_envelope(&self, envelope: SignalEnvelope) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(envelope);
    }

    /// Get all messages that were sent.
    pub fn sent_messages(&self) -> Vec<SignalMessage> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Count sent messages with the given wire token.
    pub fn sent_count(&self, token: &str) -> usize {
        self.sent_messages()
            .iter()
            .filter(|m| m.token() == token)
            .count()
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Delay the connector's open() of this channel, to script the
    /// channel-open suspension point in interleaving tests.
    pub fn set_open_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.open_delay = Some(delay);
    }

    pub(super) fn open_delay(&self) -> Option<Duration> {
        self.inner.lock().unwrap().open_delay
    }

    /// Check whether close() was called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

#[async_trait]
impl SignalChannel for MockChannel {
    async fn send(&self, message: &SignalMessage) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(ChannelError::Closed);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(ChannelError::SendFailed(error));
        }

        inner.sent_messages.push(message.clone());
        Ok(())
    }

    async fn recv(&self) -> Result<SignalEnvelope, ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(ChannelError::Closed);
        }
        inner.receive_queue.pop_front().ok_or(ChannelError::Closed)
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        Ok(())
    }
}

/// Mock connector with a scripted queue of channel-open outcomes.
///
/// Each `open()` call pops the next scripted outcome in order; the first
/// open of a [`SendSession::run`](crate::SendSession::run) is always the
/// coordination channel.
#[derive(Debug, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<MockConnectorInner>>,
}

#[derive(Debug, Default)]
struct MockConnectorInner {
    outcomes: VecDeque<Result<Arc<MockChannel>, String>>,
    opened: Vec<(ChannelRole, TransferId)>,
}

impl Clone for MockConnector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockConnector {
    /// Create a new mock connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next open() to yield this channel.
    pub fn queue_channel(&self, channel: Arc<MockChannel>) {
        let mut inner = self.inner.lock().unwrap();
        inner.outcomes.push_back(Ok(channel));
    }

    /// Script the next open() to fail with the given error.
    pub fn queue_open_failure(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.outcomes.push_back(Err(error.to_string()));
    }

    /// Get the (role, transfer id) of every open() call, in order.
    pub fn opened(&self) -> Vec<(ChannelRole, TransferId)> {
        let inner = self.inner.lock().unwrap();
        inner.opened.clone()
    }
}

#[async_trait]
impl SignalConnector for MockConnector {
    async fn open(
        &self,
        role: ChannelRole,
        transfer_id: &TransferId,
    ) -> Result<Arc<dyn SignalChannel>, ChannelError> {
        let outcome = {
            let mut inner = self.inner.lock().unwrap();
            inner.opened.push((role, transfer_id.clone()));
            inner
                .outcomes
                .pop_front()
                .unwrap_or_else(|| Err("no scripted channel".to_string()))
        };

        let channel = outcome.map_err(ChannelError::ConnectionFailed)?;
        if let Some(delay) = channel.open_delay() {
            tokio::time::sleep(delay).await;
        }
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use send_types::PeerAddr;

    fn envelope(sender: &str, message: &SignalMessage) -> SignalEnvelope {
        SignalEnvelope::seal(PeerAddr::new(sender), message).unwrap()
    }

    // ===========================================
    // MockChannel Tests
    // ===========================================

    #[tokio::test]
    async fn channel_captures_sent_messages() {
        let channel = MockChannel::new();

        channel.send(&SignalMessage::NewRecipient).await.unwrap();

        let sent = channel.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token(), "NEW_RECIPIENT");
    }

    #[tokio::test]
    async fn channel_returns_queued_envelopes_in_order() {
        let channel = MockChannel::new();
        channel.queue_envelope(envelope("a", &SignalMessage::NewRecipient));
        channel.queue_envelope(envelope("b", &SignalMessage::NewRecipient));

        assert_eq!(channel.recv().await.unwrap().sender, PeerAddr::new("a"));
        assert_eq!(channel.recv().await.unwrap().sender, PeerAddr::new("b"));
    }

    #[tokio::test]
    async fn drained_queue_reports_closed() {
        let channel = MockChannel::new();
        let result = channel.recv().await;
        assert!(matches!(result, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn closed_channel_rejects_traffic() {
        let channel = MockChannel::new();
        channel.queue_envelope(envelope("a", &SignalMessage::NewRecipient));
        channel.close().await.unwrap();
        assert!(channel.is_closed());

        assert!(matches!(
            channel.send(&SignalMessage::NewRecipient).await,
            Err(ChannelError::Closed)
        ));
        assert!(matches!(channel.recv().await, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn forced_send_failure_is_consumed() {
        let channel = MockChannel::new();
        channel.fail_next_send("buffer full");

        let result = channel.send(&SignalMessage::NewRecipient).await;
        assert!(matches!(result, Err(ChannelError::SendFailed(_))));

        // Next send works.
        channel.send(&SignalMessage::NewRecipient).await.unwrap();
        assert_eq!(channel.sent_count("NEW_RECIPIENT"), 1);
    }

    // ===========================================
    // MockConnector Tests
    // ===========================================

    #[tokio::test]
    async fn connector_yields_scripted_channels_in_order() {
        let connector = MockConnector::new();
        let first = MockChannel::new();
        let second = MockChannel::new();
        connector.queue_channel(first.clone());
        connector.queue_channel(second.clone());

        let id = TransferId::new("t1");
        connector.open(ChannelRole::Offerer, &id).await.unwrap();
        connector.open(ChannelRole::Sender, &id).await.unwrap();

        let opened = connector.opened();
        assert_eq!(
            opened,
            vec![
                (ChannelRole::Offerer, TransferId::new("t1")),
                (ChannelRole::Sender, TransferId::new("t1")),
            ]
        );
    }

    #[tokio::test]
    async fn scripted_open_failure() {
        let connector = MockConnector::new();
        connector.queue_open_failure("dial failed");

        let result = connector
            .open(ChannelRole::Sender, &TransferId::new("t1"))
            .await;
        assert!(matches!(result, Err(ChannelError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn unscripted_open_fails() {
        let connector = MockConnector::new();
        let result = connector
            .open(ChannelRole::Offerer, &TransferId::new("t1"))
            .await;
        assert!(matches!(result, Err(ChannelError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn open_delay_suspends_open() {
        let connector = MockConnector::new();
        let channel = MockChannel::new();
        channel.set_open_delay(Duration::from_millis(30));
        connector.queue_channel(channel);

        let start = std::time::Instant::now();
        connector
            .open(ChannelRole::Sender, &TransferId::new("t1"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
