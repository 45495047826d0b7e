//! Payment and print capability boundaries
//!
//! The orchestrator treats payment and printing as opaque, possibly slow,
//! possibly failing black boxes. Both are invoked only from their dedicated
//! session phase and always under a timeout; a hung provider can stall its
//! own booth's transaction but never the orchestrator loop or other booths.

use async_trait::async_trait;

use crate::session::state::ImageRef;

/// Error type for capability invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    /// The provider reported a failure (declined payment, print jam, ...)
    Failed,
    /// The provider did not answer within the configured bound
    Timeout,
}

impl std::fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityError::Failed => write!(f, "Capability reported failure"),
            CapabilityError::Timeout => write!(f, "Capability timed out"),
        }
    }
}

impl std::error::Error for CapabilityError {}

/// Payment provider boundary
#[async_trait]
pub trait PaymentCapability: Send + Sync {
    /// Charge the customer. Invoked only from the payment phase.
    async fn charge(&self, amount_cents: u32) -> Result<(), CapabilityError>;
}

/// Printer boundary
#[async_trait]
pub trait PrintCapability: Send + Sync {
    /// Print the captured image. Invoked only from the printing phase.
    async fn print(&self, image: &ImageRef) -> Result<(), CapabilityError>;
}
