//! Byte-stream transport for the relay framing
//!
//! Bridges a remote customer device speaking the wire framing to the
//! in-process relay channels. One task per device stream: inbound bytes are
//! decoded into `RelayMessage`s and fed into the `CustomerLink`, outbound
//! booth commands are encoded back onto the stream. Generic over
//! `AsyncRead + AsyncWrite` so tests run on an in-memory duplex and
//! deployments run on TCP.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

use crate::session::event::SessionEvent;

use super::channel::{CustomerLink, MediaRelay};
use super::error::RelayError;
use super::frame::RelayMessage;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Serve one customer device over a framed byte stream
///
/// Admits the stream on `relay`, announces the connection to the
/// orchestrator queue, then shuttles frames both ways until either side
/// disconnects. A stream error ends the call with `RelayError::Io`. While
/// another connection is active the device is answered with a single
/// `Busy` frame and the call returns `RelayError::Busy`.
pub async fn serve_connection<S>(
    relay: &MediaRelay,
    events: mpsc::Sender<SessionEvent>,
    stream: S,
) -> Result<(), RelayError>
where
    S: AsyncRead + AsyncWrite,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let (mut link, conn) = match relay.accept(events.clone()).await {
        Ok(pair) => pair,
        Err(RelayError::Busy) => {
            let mut out = BytesMut::new();
            RelayMessage::Busy.encode(&mut out);
            writer.write_all(&out).await.map_err(io_error)?;
            return Err(RelayError::Busy);
        }
        Err(e) => return Err(e),
    };

    events
        .send(SessionEvent::Connected { conn })
        .await
        .map_err(|_| RelayError::ChannelClosed)?;

    let result = shuttle(&mut link, &mut reader, &mut writer).await;
    link.close().await;
    result
}

/// Move frames between the stream and the relay channels until either side
/// closes
async fn shuttle<S>(
    link: &mut CustomerLink,
    reader: &mut ReadHalf<S>,
    writer: &mut WriteHalf<S>,
) -> Result<(), RelayError>
where
    S: AsyncRead + AsyncWrite,
{
    let conn_id = link.conn_id();
    let mut inbound = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut outbound = BytesMut::new();

    loop {
        tokio::select! {
            command = link.next_command() => {
                // The booth side closed the connection when the channel ends
                let Some(command) = command else { return Ok(()) };
                let disconnect = command == RelayMessage::Disconnect;

                outbound.clear();
                command.encode(&mut outbound);
                writer.write_all(&outbound).await.map_err(io_error)?;

                if disconnect {
                    return Ok(());
                }
            }

            read = reader.read_buf(&mut inbound) => {
                if read.map_err(io_error)? == 0 {
                    tracing::debug!(conn_id = conn_id, "Device stream ended");
                    return Ok(());
                }

                while let Some(message) = RelayMessage::decode(&mut inbound)? {
                    match message {
                        RelayMessage::Paired => link.pairing_ack().await?,
                        RelayMessage::PreviewFrame(frame) => {
                            if link.send_preview(frame).is_err() {
                                return Ok(());
                            }
                        }
                        RelayMessage::CaptureResult(data) => {
                            link.send_capture_result(data).await?;
                        }
                        RelayMessage::Disconnect => return Ok(()),
                        other => {
                            tracing::warn!(
                                conn_id = conn_id,
                                ?other,
                                "Unexpected inbound frame"
                            );
                        }
                    }
                }
            }
        }
    }
}

fn io_error(e: std::io::Error) -> RelayError {
    RelayError::Io(e.kind())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use crate::session::event::RelayEvent;

    use super::*;

    async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut BytesMut) -> RelayMessage {
        loop {
            if let Some(message) = RelayMessage::decode(buf).unwrap() {
                return message;
            }
            assert_ne!(reader.read_buf(buf).await.unwrap(), 0, "stream ended mid-frame");
        }
    }

    async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: RelayMessage) {
        let mut out = BytesMut::new();
        message.encode(&mut out);
        writer.write_all(&out).await.unwrap();
    }

    #[tokio::test]
    async fn test_busy_answered_with_busy_frame() {
        let relay = MediaRelay::new();
        let (tx, _rx) = mpsc::channel(32);
        let (_link, _handle) = relay.accept(tx.clone()).await.unwrap();

        let (booth_end, mut device_end) = tokio::io::duplex(1024);
        let result = serve_connection(&relay, tx, booth_end).await;
        assert!(matches!(result, Err(RelayError::Busy)));

        let mut buf = BytesMut::new();
        assert_eq!(read_frame(&mut device_end, &mut buf).await, RelayMessage::Busy);
    }

    #[tokio::test]
    async fn test_framed_exchange_end_to_end() {
        let relay = Arc::new(MediaRelay::new());
        let (tx, mut rx) = mpsc::channel(32);
        let (booth_end, mut device_end) = tokio::io::duplex(64 * 1024);

        let serve = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move { serve_connection(&relay, tx, booth_end).await }
        });

        // The admitted connection arrives on the orchestrator queue
        let handle = match rx.recv().await {
            Some(SessionEvent::Connected { conn }) => conn,
            other => panic!("expected Connected, got {:?}", other),
        };

        // Device pairs and streams a preview frame over the wire
        write_frame(&mut device_end, RelayMessage::Paired).await;
        match rx.recv().await {
            Some(SessionEvent::Relay { event: RelayEvent::PairingAck, .. }) => {}
            other => panic!("expected pairing ack, got {:?}", other),
        }

        write_frame(
            &mut device_end,
            RelayMessage::PreviewFrame(Bytes::from_static(&[1, 2, 3])),
        )
        .await;
        match rx.recv().await {
            Some(SessionEvent::Relay { event: RelayEvent::Preview(frame), .. }) => {
                assert_eq!(frame, Bytes::from_static(&[1, 2, 3]));
            }
            other => panic!("expected preview, got {:?}", other),
        }

        // Booth directive comes out framed on the device end
        handle.send_capture_cmd().await.unwrap();
        let mut buf = BytesMut::new();
        assert_eq!(
            read_frame(&mut device_end, &mut buf).await,
            RelayMessage::CaptureCmd
        );

        // Device answers with the payload, then disconnects
        write_frame(
            &mut device_end,
            RelayMessage::CaptureResult(Bytes::from_static(b"jpeg")),
        )
        .await;
        match rx.recv().await {
            Some(SessionEvent::Relay { event: RelayEvent::CaptureResult(data), .. }) => {
                assert_eq!(data, Bytes::from_static(b"jpeg"));
            }
            other => panic!("expected capture result, got {:?}", other),
        }

        write_frame(&mut device_end, RelayMessage::Disconnect).await;
        match rx.recv().await {
            Some(SessionEvent::Relay { event: RelayEvent::Disconnected, .. }) => {}
            other => panic!("expected disconnect, got {:?}", other),
        }
        assert!(serve.await.unwrap().is_ok());

        // Slot is freed once the pump winds down
        while relay.is_busy().await {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_invalid_frame_closes_connection() {
        let relay = Arc::new(MediaRelay::new());
        let (tx, mut rx) = mpsc::channel(32);
        let (booth_end, mut device_end) = tokio::io::duplex(1024);

        let serve = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move { serve_connection(&relay, tx, booth_end).await }
        });
        // Keep the booth-side handle alive: dropping it closes the command
        // channel, which races the invalid frame as a graceful shutdown.
        let _conn = match rx.recv().await {
            Some(SessionEvent::Connected { conn }) => conn,
            other => panic!("expected Connected, got {:?}", other),
        };

        device_end.write_all(&[0x7f]).await.unwrap();
        assert_eq!(serve.await.unwrap(), Err(RelayError::InvalidFrame(0x7f)));

        // The connection is torn down and the booth can admit a new device
        while relay.is_busy().await {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_device_eof_reported_as_disconnect() {
        let relay = Arc::new(MediaRelay::new());
        let (tx, mut rx) = mpsc::channel(32);
        let (booth_end, device_end) = tokio::io::duplex(1024);

        let serve = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move { serve_connection(&relay, tx, booth_end).await }
        });
        assert!(matches!(rx.recv().await, Some(SessionEvent::Connected { .. })));

        drop(device_end);
        assert!(serve.await.unwrap().is_ok());
        match rx.recv().await {
            Some(SessionEvent::Relay { event: RelayEvent::Disconnected, .. }) => {}
            other => panic!("expected disconnect, got {:?}", other),
        }
    }
}
