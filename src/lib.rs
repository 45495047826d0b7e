//! # photobooth-rs
//!
//! Coordination library for self-service photo booths. Three actors run one
//! photo transaction end to end: a fixed kiosk, a backend directory, and a
//! transient customer device.
//!
//! ```text
//!   Customer device           Kiosk (per booth)            Backend
//!   ───────────────           ─────────────────            ───────
//!   DirectoryClient ──────────────────────────────────► PresenceRegistry
//!        │  find idle booth                                 ▲  ▲
//!        ▼                                                  │  │ heartbeat,
//!   CustomerLink ◄────────► MediaRelay                      │  │ busy/idle
//!     pairing, preview,         │ events                    │  │
//!     capture payload           ▼                           │  │
//!                         SessionOrchestrator ──────────────┘  │
//!                           │         │    status reports      │
//!                           ▼         ▼                        │
//!                        Payment    Print      [sweep task] ───┘
//!                       capability capability   stale → offline
//! ```
//!
//! The hard part is not any single call but the orchestration: the
//! per-booth state machine survives flaky mobile connections, rejects
//! out-of-order commands, recovers from disconnects at any stage, and
//! guarantees a booth is never left stuck outside idle: every non-idle
//! phase carries a bounded path back.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use photobooth_rs::{BoothHandle, PresenceRegistry, SessionConfig, RelayConfig};
//! # use photobooth_rs::capability::{PaymentCapability, PrintCapability, CapabilityError};
//! # use photobooth_rs::ImageRef;
//! # struct Provider;
//! # #[async_trait::async_trait]
//! # impl PaymentCapability for Provider {
//! #     async fn charge(&self, _c: u32) -> Result<(), CapabilityError> { Ok(()) }
//! # }
//! # #[async_trait::async_trait]
//! # impl PrintCapability for Provider {
//! #     async fn print(&self, _i: &ImageRef) -> Result<(), CapabilityError> { Ok(()) }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> photobooth_rs::Result<()> {
//!     let registry = Arc::new(PresenceRegistry::new());
//!     let _sweep = registry.spawn_sweep_task();
//!
//!     let booth = BoothHandle::start(
//!         "pier-7",
//!         "10.0.0.7:9000",
//!         Arc::clone(&registry),
//!         Arc::new(Provider),
//!         Arc::new(Provider),
//!         SessionConfig::default(),
//!         RelayConfig::default(),
//!     )
//!     .await?;
//!
//!     let _customer = booth.connect_customer().await?;
//!     Ok(())
//! }
//! ```

pub mod booth;
pub mod capability;
pub mod directory;
pub mod error;
pub mod registry;
pub mod relay;
pub mod session;

pub use booth::BoothHandle;
pub use capability::{CapabilityError, PaymentCapability, PrintCapability};
pub use directory::DirectoryClient;
pub use error::{Error, Result};
pub use registry::{
    Availability, BoothId, BoothInfo, BoothStatus, PresenceRegistry, RegistryConfig,
};
pub use relay::{CustomerLink, MediaRelay, RelayConfig, RelayError, RelayMessage};
pub use session::{
    FailureKind, ImageRef, SessionConfig, SessionPhase, SessionSnapshot,
};
