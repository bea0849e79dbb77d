//! Session registry keyed by peer address.
//!
//! An explicit key-value container with guaranteed insert and lookup
//! semantics. A session must be registered before any handshake message
//! addressed to it can be routed; a duplicate registration is a protocol
//! anomaly, never a silent overwrite, and a lookup miss is a routing
//! error, never a silent drop.

use send_types::PeerAddr;
use std::collections::HashMap;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A session is already registered under this address.
    #[error("session already registered for {address}")]
    AlreadyRegistered {
        /// The address that was registered twice.
        address: PeerAddr,
    },

    /// No session is registered under this address.
    #[error("no session registered for {address}")]
    NotFound {
        /// The address that missed.
        address: PeerAddr,
    },
}

/// Mapping from peer address to recipient session.
///
/// Keys are unique; no ordering semantics. The container itself is not
/// synchronized: callers running admissions concurrently own the
/// exclusion discipline (send-client keeps it behind a single mutex).
#[derive(Debug, Default)]
pub struct SessionRegistry<S> {
    entries: HashMap<PeerAddr, S>,
}

impl<S> SessionRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a session under an address.
    ///
    /// Fails if an entry already exists for that address.
    pub fn register(&mut self, address: PeerAddr, session: S) -> Result<(), RegistryError> {
        if self.entries.contains_key(&address) {
            return Err(RegistryError::AlreadyRegistered { address });
        }
        self.entries.insert(address, session);
        Ok(())
    }

    /// Look up the session for an address.
    pub fn lookup(&self, address: &PeerAddr) -> Result<&S, RegistryError> {
        self.entries
            .get(address)
            .ok_or_else(|| RegistryError::NotFound {
                address: address.clone(),
            })
    }

    /// Remove a registration, returning the session if it existed.
    ///
    /// Used to discard a partial registration when an admission fails
    /// after its register step.
    pub fn remove(&mut self, address: &PeerAddr) -> Option<S> {
        self.entries.remove(address)
    }

    /// Check whether an address is registered.
    pub fn contains(&self, address: &PeerAddr) -> bool {
        self.entries.contains_key(address)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over registered address/session pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerAddr, &S)> {
        self.entries.iter()
    }

    /// Iterate over registered addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &PeerAddr> {
        self.entries.keys()
    }
}
