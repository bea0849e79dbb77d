//! Configuration for the send session.

use std::time::Duration;
use url::Url;

/// Default transfer validity window (24 hours).
pub const DEFAULT_VALIDITY_SECS: i64 = 24 * 60 * 60;

/// Default bound on waiting for a per-recipient channel to open.
pub const DEFAULT_ADMISSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for a recipient's transport to become ready.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a [`SendSession`](crate::SendSession).
#[derive(Debug, Clone)]
pub struct SendConfig {
    /// Relay signaling endpoint (WebSocket). Channels add `role` and
    /// `transfer_id` query parameters.
    pub signal_endpoint: Url,
    /// Metadata publish endpoint (HTTP).
    pub api_endpoint: Url,
    /// Origin used to build the shareable receive link.
    pub share_origin: Url,
    /// How long published metadata stays valid, in seconds.
    pub valid_for_secs: i64,
    /// Bound on waiting for a per-recipient channel to open.
    pub admission_timeout: Duration,
    /// Bound on waiting for a recipient's transport to become ready.
    pub handshake_timeout: Duration,
}

impl SendConfig {
    /// Create a configuration with default validity and timeouts.
    pub fn new(signal_endpoint: Url, api_endpoint: Url, share_origin: Url) -> Self {
        Self {
            signal_endpoint,
            api_endpoint,
            share_origin,
            valid_for_secs: DEFAULT_VALIDITY_SECS,
            admission_timeout: DEFAULT_ADMISSION_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Set the transfer validity window in seconds.
    pub fn with_validity_secs(mut self, secs: i64) -> Self {
        self.valid_for_secs = secs;
        self
    }

    /// Set the admission timeout.
    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SendConfig {
        SendConfig::new(
            Url::parse("wss://signal.sendfiles.dev/ws").unwrap(),
            Url::parse("https://api.sendfiles.dev/transfers").unwrap(),
            Url::parse("https://sendfiles.dev").unwrap(),
        )
    }

    #[test]
    fn defaults_are_applied() {
        let config = test_config();
        assert_eq!(config.valid_for_secs, DEFAULT_VALIDITY_SECS);
        assert_eq!(config.admission_timeout, DEFAULT_ADMISSION_TIMEOUT);
        assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
    }

    #[test]
    fn builder_pattern() {
        let config = test_config()
            .with_validity_secs(3600)
            .with_admission_timeout(Duration::from_secs(5))
            .with_handshake_timeout(Duration::from_secs(30));

        assert_eq!(config.valid_for_secs, 3600);
        assert_eq!(config.admission_timeout, Duration::from_secs(5));
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
    }
}
