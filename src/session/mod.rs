//! Session orchestration: the booth-local transaction state machine
//!
//! One transaction at a time per booth, driven by a serialized event queue:
//!
//! ```text
//!  relay pump ──┐
//!  kiosk surface├──► mpsc queue ──► SessionOrchestrator ──► watch<SessionSnapshot>
//!  capabilities─┘    (one per booth)      │
//!                                          ├──► RelayHandle (capture cmd, release)
//!                                          ├──► PaymentCapability / PrintCapability
//!                                          └──► StatusReporter (busy / idle)
//! ```
//!
//! The orchestrator is the only writer of the session; everything else
//! observes it through the watch channel.

pub mod config;
pub mod event;
pub mod orchestrator;
pub mod state;

pub use config::SessionConfig;
pub use event::{RelayEvent, SessionEvent};
pub use orchestrator::{OrchestratorHandle, SessionOrchestrator, StatusReporter};
pub use state::{FailureKind, ImageRef, Session, SessionPhase, SessionSnapshot};
