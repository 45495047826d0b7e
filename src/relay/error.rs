//! Relay error types

/// Error type for media relay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A connection is already active on this booth; try another booth
    Busy,
    /// Unknown message tag on the wire
    InvalidFrame(u8),
    /// Declared payload length exceeds the allowed maximum
    PayloadTooLarge(usize),
    /// The peer or the orchestrator is gone
    ChannelClosed,
    /// The device stream failed at the transport level
    Io(std::io::ErrorKind),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Busy => write!(f, "Relay busy: a customer connection is already active"),
            RelayError::InvalidFrame(tag) => write!(f, "Invalid relay frame tag: 0x{:02x}", tag),
            RelayError::PayloadTooLarge(len) => {
                write!(f, "Relay payload too large: {} bytes", len)
            }
            RelayError::ChannelClosed => write!(f, "Relay channel closed"),
            RelayError::Io(kind) => write!(f, "Relay stream error: {:?}", kind),
        }
    }
}

impl std::error::Error for RelayError {}
