//! Registry error types
//!
//! Error types for presence registry operations.

use super::booth::BoothId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration rejected: booth name is empty
    EmptyName,
    /// Unknown booth id; the caller must re-register
    BoothNotFound(BoothId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::EmptyName => write!(f, "Booth name must not be empty"),
            RegistryError::BoothNotFound(id) => write!(f, "Booth not found: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
