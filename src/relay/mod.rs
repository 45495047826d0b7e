//! Media relay: the real-time channel between customer device and booth
//!
//! The relay owns connection admission (one live customer per booth, no
//! queueing), the typed message framing, and the delivery rules: preview
//! frames are best-effort and may be coalesced under backpressure, every
//! other message kind is delivered in order, exactly once or not at all.
//! All business meaning lives in the session orchestrator; the relay never
//! looks inside payloads.
//!
//! In-process callers hold a `CustomerLink` directly; remote devices speak
//! the wire framing over a byte stream served by `transport::serve_connection`.

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod transport;

pub use channel::{CustomerLink, MediaRelay, RelayHandle};
pub use config::RelayConfig;
pub use error::RelayError;
pub use frame::{RelayMessage, MAX_PAYLOAD_SIZE};
pub use transport::serve_connection;
