//! Relay message types and wire framing
//!
//! The relay channel carries a small set of typed messages between the
//! customer device and the booth:
//!
//! ```text
//! Customer                                  Booth
//!   |-------- PAIRED ----------------------->|   pairing ack
//!   |-------- PREVIEW_FRAME(bytes) --------->|   best-effort, may be dropped
//!   |<------- CAPTURE_CMD -------------------|   reliable
//!   |-------- CAPTURE_RESULT(bytes) -------->|   reliable, acknowledged
//!   |<------- BUSY --------------------------|   connection refused
//!   |-------- DISCONNECT ------------------->|   either direction
//! ```
//!
//! On the wire each message is a 1-byte tag; the two payload-carrying kinds
//! append a u32 big-endian length and the payload bytes. The relay never
//! interprets payload contents beyond this framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::RelayError;

/// Maximum accepted payload length (a high-resolution capture fits well
/// under this; anything larger is a corrupt or hostile length field)
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

const TAG_PAIRED: u8 = 0x01;
const TAG_PREVIEW_FRAME: u8 = 0x02;
const TAG_CAPTURE_CMD: u8 = 0x03;
const TAG_CAPTURE_RESULT: u8 = 0x04;
const TAG_BUSY: u8 = 0x05;
const TAG_DISCONNECT: u8 = 0x06;

/// A typed message on the relay channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// Pairing acknowledgement from the customer device
    Paired,
    /// Low-resolution preview frame (best-effort)
    PreviewFrame(Bytes),
    /// Capture directive from the booth
    CaptureCmd,
    /// High-resolution capture payload (never dropped)
    CaptureResult(Bytes),
    /// Connection refused: a session is already active
    Busy,
    /// Orderly close, either direction
    Disconnect,
}

impl RelayMessage {
    fn tag(&self) -> u8 {
        match self {
            RelayMessage::Paired => TAG_PAIRED,
            RelayMessage::PreviewFrame(_) => TAG_PREVIEW_FRAME,
            RelayMessage::CaptureCmd => TAG_CAPTURE_CMD,
            RelayMessage::CaptureResult(_) => TAG_CAPTURE_RESULT,
            RelayMessage::Busy => TAG_BUSY,
            RelayMessage::Disconnect => TAG_DISCONNECT,
        }
    }

    fn payload(&self) -> Option<&Bytes> {
        match self {
            RelayMessage::PreviewFrame(data) | RelayMessage::CaptureResult(data) => Some(data),
            _ => None,
        }
    }

    /// Encode this message into a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tag());
        if let Some(data) = self.payload() {
            buf.put_u32(data.len() as u32);
            buf.put_slice(data);
        }
    }

    /// Decode one message from the front of a buffer
    ///
    /// Returns `Ok(None)` if the buffer does not yet hold a complete
    /// message; consumed bytes are only removed once a full message is
    /// available.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<RelayMessage>, RelayError> {
        if buf.is_empty() {
            return Ok(None);
        }

        let tag = buf[0];
        match tag {
            TAG_PAIRED | TAG_CAPTURE_CMD | TAG_BUSY | TAG_DISCONNECT => {
                buf.advance(1);
                Ok(Some(match tag {
                    TAG_PAIRED => RelayMessage::Paired,
                    TAG_CAPTURE_CMD => RelayMessage::CaptureCmd,
                    TAG_BUSY => RelayMessage::Busy,
                    _ => RelayMessage::Disconnect,
                }))
            }
            TAG_PREVIEW_FRAME | TAG_CAPTURE_RESULT => {
                if buf.len() < 5 {
                    return Ok(None);
                }

                let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
                if len > MAX_PAYLOAD_SIZE {
                    return Err(RelayError::PayloadTooLarge(len));
                }
                if buf.len() < 5 + len {
                    return Ok(None);
                }

                buf.advance(5);
                let data = buf.split_to(len).freeze();
                Ok(Some(if tag == TAG_PREVIEW_FRAME {
                    RelayMessage::PreviewFrame(data)
                } else {
                    RelayMessage::CaptureResult(data)
                }))
            }
            unknown => Err(RelayError::InvalidFrame(unknown)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_buffer() {
        let mut buf = BytesMut::new();
        RelayMessage::CaptureResult(Bytes::from_static(b"jpeg-bytes")).encode(&mut buf);

        // Header alone is not enough
        let mut partial = BytesMut::from(&buf[..4]);
        assert_eq!(RelayMessage::decode(&mut partial).unwrap(), None);
        assert_eq!(partial.len(), 4); // nothing consumed

        // Header plus a truncated payload still waits
        let mut partial = BytesMut::from(&buf[..7]);
        assert_eq!(RelayMessage::decode(&mut partial).unwrap(), None);

        // Full buffer decodes and consumes exactly one message
        let decoded = RelayMessage::decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            decoded,
            RelayMessage::CaptureResult(Bytes::from_static(b"jpeg-bytes"))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut buf = BytesMut::from(&[0x7f_u8][..]);
        assert_eq!(
            RelayMessage::decode(&mut buf),
            Err(RelayError::InvalidFrame(0x7f))
        );
    }

    #[test]
    fn test_decode_rejects_hostile_length() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x04); // CAPTURE_RESULT
        buf.put_u32(u32::MAX);

        assert_eq!(
            RelayMessage::decode(&mut buf),
            Err(RelayError::PayloadTooLarge(u32::MAX as usize))
        );
    }

    #[test]
    fn test_decode_pipelined_messages() {
        let mut buf = BytesMut::new();
        RelayMessage::Paired.encode(&mut buf);
        RelayMessage::PreviewFrame(Bytes::from_static(&[1, 2, 3])).encode(&mut buf);
        RelayMessage::Disconnect.encode(&mut buf);

        assert_eq!(
            RelayMessage::decode(&mut buf).unwrap(),
            Some(RelayMessage::Paired)
        );
        assert_eq!(
            RelayMessage::decode(&mut buf).unwrap(),
            Some(RelayMessage::PreviewFrame(Bytes::from_static(&[1, 2, 3])))
        );
        assert_eq!(
            RelayMessage::decode(&mut buf).unwrap(),
            Some(RelayMessage::Disconnect)
        );
        assert_eq!(RelayMessage::decode(&mut buf).unwrap(), None);
    }
}
