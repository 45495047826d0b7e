//! Crate-level error type
//!
//! Each module defines its own error enum; this wraps them for callers that
//! cross module boundaries (the booth runtime, demos). State-machine
//! recoveries (capability failures, disconnects) never surface here; they
//! are handled by the orchestrator's transitions.

use crate::capability::CapabilityError;
use crate::registry::RegistryError;
use crate::relay::RelayError;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Any error the library surfaces to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Presence registry operation failed
    Registry(RegistryError),
    /// Media relay operation failed
    Relay(RelayError),
    /// Capability invocation failed
    Capability(CapabilityError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Relay(e) => write!(f, "Relay error: {}", e),
            Error::Capability(e) => write!(f, "Capability error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Registry(e) => Some(e),
            Error::Relay(e) => Some(e),
            Error::Capability(e) => Some(e),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Error::Relay(e)
    }
}

impl From<CapabilityError> for Error {
    fn from(e: CapabilityError) -> Self {
        Error::Capability(e)
    }
}
