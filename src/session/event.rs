//! Orchestrator event types
//!
//! Every input to a booth's orchestrator (relay traffic, kiosk surface
//! actions, capability results) arrives as a `SessionEvent` on one mpsc
//! queue, so at most one transition is ever evaluated at a time and the
//! session needs no lock of its own.

use bytes::Bytes;

use crate::relay::channel::RelayHandle;

/// Inbound relay traffic, tagged with its connection id by the pump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Customer acknowledged pairing
    PairingAck,
    /// Low-resolution preview frame
    Preview(Bytes),
    /// High-resolution capture payload
    CaptureResult(Bytes),
    /// Connection closed or errored
    Disconnected,
}

/// An event on a booth's serialized queue
pub enum SessionEvent {
    /// A customer connection was admitted by the relay
    Connected { conn: RelayHandle },

    /// Relay traffic from connection `conn_id`; events from a replaced
    /// connection are recognized by the id and discarded
    Relay { conn_id: u64, event: RelayEvent },

    /// Capture requested (booth operator action or customer request)
    CaptureRequested,

    /// Customer approved the captured image
    Approve,

    /// Customer asked to retake
    Retake,

    /// Explicit reset from the done screen
    Reset,

    /// Payment capability finished; `generation` is the session generation
    /// at call time (stale results are discarded)
    PaymentOutcome { generation: u64, success: bool },

    /// Print capability finished; same staleness rule as payment
    PrintOutcome { generation: u64, success: bool },
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Connected { conn } => {
                f.debug_struct("Connected").field("conn_id", &conn.conn_id()).finish()
            }
            SessionEvent::Relay { conn_id, event } => f
                .debug_struct("Relay")
                .field("conn_id", conn_id)
                .field("event", event)
                .finish(),
            SessionEvent::CaptureRequested => write!(f, "CaptureRequested"),
            SessionEvent::Approve => write!(f, "Approve"),
            SessionEvent::Retake => write!(f, "Retake"),
            SessionEvent::Reset => write!(f, "Reset"),
            SessionEvent::PaymentOutcome { generation, success } => f
                .debug_struct("PaymentOutcome")
                .field("generation", generation)
                .field("success", success)
                .finish(),
            SessionEvent::PrintOutcome { generation, success } => f
                .debug_struct("PrintOutcome")
                .field("generation", generation)
                .field("success", success)
                .finish(),
        }
    }
}
