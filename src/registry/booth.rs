//! Booth entry and status types
//!
//! This module defines the per-booth state stored in the presence registry.

use std::fmt;

use tokio::time::Instant;
use uuid::Uuid;

/// Opaque, process-unique booth identifier
///
/// Ids are allocated fresh on registration and are not recoverable across
/// registry restarts; a booth whose id is rejected must re-register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoothId(Uuid);

impl BoothId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BoothId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness status, driven by heartbeats and the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothStatus {
    /// Heartbeat seen within the liveness timeout
    Online,
    /// Missed heartbeats; marked by the sweep
    Offline,
}

/// Transaction availability, reported by the booth's orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No session in progress; the directory may route customers here
    Idle,
    /// A session is in progress
    Busy,
}

/// Entry for a single booth in the registry
#[derive(Debug)]
pub struct Booth {
    /// Unique booth id
    pub id: BoothId,

    /// Human-readable booth name
    pub name: String,

    /// Declared network address (opaque to the registry)
    pub address: String,

    /// Current liveness status
    pub status: BoothStatus,

    /// Current availability, as last reported by the orchestrator
    pub availability: Availability,

    /// Time of the most recent heartbeat (monotone)
    pub last_heartbeat: Instant,

    /// Registration sequence number, for deterministic listing order
    pub(super) seq: u64,
}

impl Booth {
    pub(super) fn new(id: BoothId, name: String, address: String, seq: u64) -> Self {
        Self {
            id,
            name,
            address,
            status: BoothStatus::Online,
            availability: Availability::Idle,
            last_heartbeat: Instant::now(),
            seq,
        }
    }

    /// Check whether this booth is online and free to take a customer
    pub fn is_available(&self) -> bool {
        self.status == BoothStatus::Online && self.availability == Availability::Idle
    }
}

/// Cloneable snapshot of a booth, returned by `list()`
#[derive(Debug, Clone)]
pub struct BoothInfo {
    /// Unique booth id
    pub id: BoothId,
    /// Human-readable booth name
    pub name: String,
    /// Declared network address
    pub address: String,
    /// Liveness status at snapshot time
    pub status: BoothStatus,
    /// Availability at snapshot time
    pub availability: Availability,
    /// Time of the most recent heartbeat
    pub last_heartbeat: Instant,
}

impl BoothInfo {
    pub(super) fn from_booth(booth: &Booth) -> Self {
        Self {
            id: booth.id,
            name: booth.name.clone(),
            address: booth.address.clone(),
            status: booth.status,
            availability: booth.availability,
            last_heartbeat: booth.last_heartbeat,
        }
    }

    /// Check whether this booth is online and free to take a customer
    pub fn is_available(&self) -> bool {
        self.status == BoothStatus::Online && self.availability == Availability::Idle
    }
}
