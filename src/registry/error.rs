//! Registry error types
//!
//! Error types for handle registry operations.

use super::handle::HandleKey;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Handle was never issued or its object was already destroyed
    StaleHandle(HandleKey),
    /// Destroy refused because live objects still reference the handle
    ReferencedByLiveObject {
        /// Handle whose destruction was refused
        key: HandleKey,
        /// Number of live dependents at the time of the call
        dependents: usize,
    },
}

impl RegistryError {
    /// Get the key the error refers to
    pub fn key(&self) -> HandleKey {
        match self {
            RegistryError::StaleHandle(key) => *key,
            RegistryError::ReferencedByLiveObject { key, .. } => *key,
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StaleHandle(key) => write!(f, "Stale handle: {}", key),
            RegistryError::ReferencedByLiveObject { key, dependents } => {
                write!(f, "{} is referenced by {} live object(s)", key, dependents)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
