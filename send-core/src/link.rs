//! Receive link construction.
//!
//! The shareable reference handed back to the caller after a successful
//! publish: the sharing origin, a fixed receive path segment, and the
//! published transfer id. This is the only externally visible artifact of
//! a successful negotiation setup.

use send_types::TransferId;
use thiserror::Error;
use url::Url;

/// Fixed path segment of the receive route.
pub const RECEIVE_PATH_SEGMENT: &str = "receive";

/// Link construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The origin URL cannot carry path segments (e.g. a data: URL).
    #[error("share origin cannot carry a path: {origin}")]
    OpaqueOrigin {
        /// The offending origin.
        origin: String,
    },
}

/// Build the shareable receive link for a published transfer.
pub fn receive_link(origin: &Url, id: &TransferId) -> Result<Url, LinkError> {
    let mut link = origin.clone();
    {
        let mut segments = link
            .path_segments_mut()
            .map_err(|_| LinkError::OpaqueOrigin {
                origin: origin.to_string(),
            })?;
        segments.pop_if_empty();
        segments.push(RECEIVE_PATH_SEGMENT);
        segments.push(id.as_str());
    }
    Ok(link)
}
