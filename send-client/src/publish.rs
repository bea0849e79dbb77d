//! Metadata publishing.
//!
//! Before any recipient can connect, the sender publishes transfer
//! metadata (file name, ciphertext length, exported key, expiry) and
//! receives the transfer id that scopes every signaling channel. A single
//! failed publish is fatal to the whole send operation; no retry policy
//! is applied here.

use async_trait::async_trait;
use send_types::{TransferReceipt, TransferRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Publish errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The request could not be sent.
    #[error("publish request failed: {0}")]
    Request(String),

    /// The service rejected the request.
    #[error("publish rejected with status {status}")]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,
    },

    /// The response body did not match the expected schema.
    #[error("publish response malformed: {0}")]
    Response(String),
}

/// Publishes transfer metadata and returns the assigned transfer id.
#[async_trait]
pub trait MetadataPublisher: Send + Sync {
    /// Publish the metadata for one transfer.
    async fn publish(&self, request: &TransferRequest) -> Result<TransferReceipt, PublishError>;
}

/// HTTP implementation of [`MetadataPublisher`].
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpPublisher {
    /// Create a publisher posting to the given endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MetadataPublisher for HttpPublisher {
    async fn publish(&self, request: &TransferRequest) -> Result<TransferReceipt, PublishError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
            });
        }

        let receipt: TransferReceipt = response
            .json()
            .await
            .map_err(|e| PublishError::Response(e.to_string()))?;
        debug!(transfer_id = %receipt.id, "metadata published");
        Ok(receipt)
    }
}

/// Mock publisher for testing.
///
/// Allows queueing receipts and failures, and captures published
/// requests for verification.
#[derive(Debug, Default)]
pub struct MockPublisher {
    inner: Arc<Mutex<MockPublisherInner>>,
}

impl Clone for MockPublisher {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug, Default)]
struct MockPublisherInner {
    receipts: VecDeque<TransferReceipt>,
    requests: Vec<TransferRequest>,
    fail_next: Option<String>,
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a receipt to be returned by the next publish() call.
    pub fn queue_receipt(&self, receipt: TransferReceipt) {
        let mut inner = self.inner.lock().unwrap();
        inner.receipts.push_back(receipt);
    }

    /// Cause the next publish() to fail with the given error.
    pub fn fail_next_publish(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next = Some(error.to_string());
    }

    /// Get all requests that were published.
    pub fn requests(&self) -> Vec<TransferRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }
}

#[async_trait]
impl MetadataPublisher for MockPublisher {
    async fn publish(&self, request: &TransferRequest) -> Result<TransferReceipt, PublishError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next.take() {
            return Err(PublishError::Request(error));
        }

        inner.requests.push(request.clone());
        inner
            .receipts
            .pop_front()
            .ok_or(PublishError::Rejected { status: 500 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use send_types::{EncryptedPayload, KeyMaterial, TransferId};

    fn test_request() -> TransferRequest {
        let payload = EncryptedPayload::new(
            vec![1, 2, 3],
            "photo.jpg",
            KeyMaterial::from_bytes(vec![9, 9]),
        );
        TransferRequest::for_payload(
            &payload,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn mock_returns_queued_receipt_and_captures_request() {
        let publisher = MockPublisher::new();
        publisher.queue_receipt(TransferReceipt {
            id: TransferId::new("abc123"),
        });

        let receipt = publisher.publish(&test_request()).await.unwrap();
        assert_eq!(receipt.id, TransferId::new("abc123"));

        let requests = publisher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file_name, "photo.jpg");
        assert_eq!(requests[0].content_length_bytes, 3);
    }

    #[tokio::test]
    async fn mock_forced_failure_is_consumed() {
        let publisher = MockPublisher::new();
        publisher.fail_next_publish("service unavailable");

        let result = publisher.publish(&test_request()).await;
        assert!(matches!(result, Err(PublishError::Request(_))));

        // Next publish works once a receipt is queued.
        publisher.queue_receipt(TransferReceipt {
            id: TransferId::new("t2"),
        });
        assert!(publisher.publish(&test_request()).await.is_ok());
    }

    #[tokio::test]
    async fn mock_without_receipt_rejects() {
        let publisher = MockPublisher::new();
        let result = publisher.publish(&test_request()).await;
        assert!(matches!(
            result,
            Err(PublishError::Rejected { status: 500 })
        ));
    }

    #[test]
    fn http_publisher_construction() {
        let publisher = HttpPublisher::new(Url::parse("https://api.sendfiles.dev/transfers").unwrap());
        assert_eq!(
            publisher.endpoint.as_str(),
            "https://api.sendfiles.dev/transfers"
        );
    }
}
