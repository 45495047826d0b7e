//! Directory client
//!
//! The customer-facing read side of the presence registry: find a booth
//! that is both alive (heartbeating) and idle (no session in progress). A
//! booth that answers `Busy` on connect should not be retried; the client
//! picks a different booth instead.

use std::sync::Arc;

use crate::registry::{BoothInfo, PresenceRegistry};

/// Read-only view over the presence registry
#[derive(Clone)]
pub struct DirectoryClient {
    registry: Arc<PresenceRegistry>,
}

impl DirectoryClient {
    /// Create a client over a registry
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// List all known booths, in registration order
    pub async fn booths(&self) -> Vec<BoothInfo> {
        self.registry.list().await
    }

    /// Find the first booth that is online and idle
    pub async fn find_available(&self) -> Option<BoothInfo> {
        self.registry
            .list()
            .await
            .into_iter()
            .find(BoothInfo::is_available)
    }
}
