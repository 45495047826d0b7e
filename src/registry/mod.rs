//! Presence registry for booth directory and liveness
//!
//! The registry tracks every booth's identity, declared address, liveness
//! (heartbeat-driven) and availability (reported by the booth's session
//! orchestrator). Directory clients read it to find a reachable, idle booth.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<PresenceRegistry>
//!                   ┌────────────────────────────┐
//!                   │ booths: HashMap<BoothId,   │
//!                   │   Arc<RwLock<Booth {       │
//!                   │     status, availability,  │
//!                   │     last_heartbeat,        │
//!                   │   }>>                      │
//!                   └─────────────┬──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Booth A]               [Booth B]             [DirectoryClient]
//!    heartbeat()             heartbeat()           list() → pick idle
//!    set_availability()      set_availability()
//!
//!    [sweep task]  every heartbeat interval: stale booths → Offline
//! ```
//!
//! Liveness is active, not inferred: without the sweep, a booth that loses
//! power would stay "online" in the directory indefinitely.

pub mod booth;
pub mod config;
pub mod error;
pub mod store;

pub use booth::{Availability, Booth, BoothId, BoothInfo, BoothStatus};
pub use config::RegistryConfig;
pub use error::RegistryError;
pub use store::PresenceRegistry;
