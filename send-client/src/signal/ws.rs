//! WebSocket signaling channels.
//!
//! The production [`SignalConnector`]: each channel is one WebSocket
//! connection against the relay endpoint, addressed with `role` and
//! `transfer_id` query parameters. Messages travel as JSON text frames.

use super::{ChannelError, ChannelRole, SignalChannel, SignalConnector};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use send_types::{SignalEnvelope, SignalMessage, TransferId};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket signaling channels against a relay endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: Url,
}

impl WsConnector {
    /// Create a connector for the given signaling endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }

    fn channel_url(&self, role: ChannelRole, transfer_id: &TransferId) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("role", role.as_str())
            .append_pair("transfer_id", transfer_id.as_str());
        url
    }
}

#[async_trait]
impl SignalConnector for WsConnector {
    async fn open(
        &self,
        role: ChannelRole,
        transfer_id: &TransferId,
    ) -> Result<Arc<dyn SignalChannel>, ChannelError> {
        let url = self.channel_url(role, transfer_id);
        debug!(%url, role = role.as_str(), "opening signaling channel");

        // connect_async resolves once the handshake completes, so the
        // channel is usable as soon as open() returns.
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let (sink, stream) = stream.split();
        Ok(Arc::new(WsChannel {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }))
    }
}

/// One WebSocket signaling channel.
pub struct WsChannel {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

#[async_trait]
impl SignalChannel for WsChannel {
    async fn send(&self, message: &SignalMessage) -> Result<(), ChannelError> {
        let text = message
            .to_json()
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<SignalEnvelope, ChannelError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match SignalEnvelope::from_json(&text) {
                    Ok(envelope) => return Ok(envelope),
                    Err(err) => {
                        // One undecodable frame must not end the channel.
                        warn!(error = %err, "skipping undecodable signaling frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                Some(Ok(other)) => {
                    debug!(frame = ?other, "skipping non-text signaling frame");
                    continue;
                }
                Some(Err(e)) => return Err(ChannelError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}
