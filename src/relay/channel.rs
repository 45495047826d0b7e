//! Relay connection management
//!
//! Each booth owns one `MediaRelay`. It admits at most one live customer
//! connection at a time; while one is active every further `accept` fails
//! with `RelayError::Busy` (never queued; the directory is expected to
//! route the customer to a different idle booth).
//!
//! Inbound traffic is split into two paths with different delivery rules:
//!
//! - control messages (`Paired`, `CaptureResult`, `Disconnect`) travel over
//!   a bounded reliable channel, in order, never dropped;
//! - preview frames go through a small bounded queue where the *oldest*
//!   unsent frame is discarded under backpressure, keeping the preview
//!   fresh at the cost of completeness.
//!
//! A per-connection pump task forwards both paths into the orchestrator's
//! serialized event queue, tagging every event with the connection id so a
//! late event from a dead connection can never be attributed to a newer one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::session::event::{RelayEvent, SessionEvent};

use super::config::RelayConfig;
use super::error::RelayError;
use super::frame::RelayMessage;

/// Per-connection state shared between the link, the handle and the pump
struct ConnShared {
    conn_id: u64,
    closed: AtomicBool,
    notify: Notify,
    preview: StdMutex<VecDeque<Bytes>>,
    preview_depth: usize,
    dropped_previews: AtomicU64,
}

impl ConnShared {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lock_preview(&self) -> std::sync::MutexGuard<'_, VecDeque<Bytes>> {
        self.preview.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Media relay endpoint for one booth
pub struct MediaRelay {
    config: RelayConfig,
    /// Active connection id, `None` when the booth is free
    slot: Arc<Mutex<Option<u64>>>,
    next_conn_id: AtomicU64,
}

impl MediaRelay {
    /// Create a relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a relay with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            config,
            slot: Arc::new(Mutex::new(None)),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Check whether a connection is currently active
    pub async fn is_busy(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Admit a customer connection
    ///
    /// Returns the customer-side link and the booth-side handle, and spawns
    /// the pump task that feeds `events`. Fails with `RelayError::Busy`
    /// while another connection is active.
    pub async fn accept(
        &self,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<(CustomerLink, RelayHandle), RelayError> {
        let conn_id = {
            let mut slot = self.slot.lock().await;
            if slot.is_some() {
                tracing::debug!("Connection refused: relay busy");
                return Err(RelayError::Busy);
            }
            let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
            *slot = Some(conn_id);
            conn_id
        };

        let shared = Arc::new(ConnShared {
            conn_id,
            closed: AtomicBool::new(false),
            notify: Notify::new(),
            preview: StdMutex::new(VecDeque::new()),
            preview_depth: self.config.preview_queue_depth,
            dropped_previews: AtomicU64::new(0),
        });

        let (control_tx, control_rx) = mpsc::channel(self.config.control_queue_depth);
        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_depth);

        tokio::spawn(pump(
            Arc::clone(&shared),
            control_rx,
            events,
            Arc::clone(&self.slot),
        ));

        tracing::debug!(conn_id = conn_id, "Customer connection admitted");

        let link = CustomerLink {
            shared: Arc::clone(&shared),
            control_tx,
            commands: command_rx,
        };
        let handle = RelayHandle {
            shared,
            command_tx,
            slot: Arc::clone(&self.slot),
        };

        Ok((link, handle))
    }
}

impl Default for MediaRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Customer-device side of a relay connection
pub struct CustomerLink {
    shared: Arc<ConnShared>,
    control_tx: mpsc::Sender<RelayMessage>,
    commands: mpsc::Receiver<RelayMessage>,
}

impl CustomerLink {
    /// Connection id, unique per relay
    pub fn conn_id(&self) -> u64 {
        self.shared.conn_id
    }

    /// Acknowledge pairing
    pub async fn pairing_ack(&self) -> Result<(), RelayError> {
        self.control_tx
            .send(RelayMessage::Paired)
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    /// Queue a preview frame (best-effort)
    ///
    /// When the queue is full the oldest unsent frame is dropped; delivery
    /// of the frame just queued is still not guaranteed.
    pub fn send_preview(&self, frame: Bytes) -> Result<(), RelayError> {
        if self.shared.is_closed() {
            return Err(RelayError::ChannelClosed);
        }

        {
            let mut queue = self.shared.lock_preview();
            queue.push_back(frame);
            while queue.len() > self.shared.preview_depth {
                queue.pop_front();
                self.shared.dropped_previews.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.shared.notify.notify_one();

        Ok(())
    }

    /// Deliver the high-resolution capture payload (reliable)
    pub async fn send_capture_result(&self, data: Bytes) -> Result<(), RelayError> {
        self.control_tx
            .send(RelayMessage::CaptureResult(data))
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    /// Receive the next command from the booth (`CaptureCmd` or `Disconnect`)
    pub async fn next_command(&mut self) -> Option<RelayMessage> {
        self.commands.recv().await
    }

    /// Preview frames dropped under backpressure so far
    pub fn dropped_previews(&self) -> u64 {
        self.shared.dropped_previews.load(Ordering::Relaxed)
    }

    /// Close the connection from the customer side
    ///
    /// Dropping the link without calling this has the same effect: the pump
    /// observes the closed control channel and reports a disconnect.
    pub async fn close(self) {
        let _ = self.control_tx.send(RelayMessage::Disconnect).await;
    }
}

/// Booth side of a relay connection, referenced by the active session
pub struct RelayHandle {
    shared: Arc<ConnShared>,
    command_tx: mpsc::Sender<RelayMessage>,
    slot: Arc<Mutex<Option<u64>>>,
}

impl RelayHandle {
    /// Connection id, unique per relay
    pub fn conn_id(&self) -> u64 {
        self.shared.conn_id
    }

    /// Send the capture directive to the customer device
    pub async fn send_capture_cmd(&self) -> Result<(), RelayError> {
        self.command_tx
            .send(RelayMessage::CaptureCmd)
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    /// Release the connection from the booth side
    ///
    /// Tells the customer to disconnect, stops the pump and frees the relay
    /// slot. Guarded by connection id: releasing a handle from an already
    /// replaced connection never evicts the newer one.
    pub async fn release(&self) {
        let _ = self.command_tx.try_send(RelayMessage::Disconnect);
        self.shared.close();
        release_slot(&self.slot, self.shared.conn_id).await;
    }
}

async fn release_slot(slot: &Mutex<Option<u64>>, conn_id: u64) {
    let mut slot = slot.lock().await;
    if *slot == Some(conn_id) {
        *slot = None;
    }
}

/// Forward inbound traffic to the orchestrator's event queue
///
/// Control messages take priority over buffered preview frames. Exits when
/// the customer disconnects (message or channel close) or the booth side
/// releases the connection, then frees the relay slot.
async fn pump(
    shared: Arc<ConnShared>,
    mut control_rx: mpsc::Receiver<RelayMessage>,
    events: mpsc::Sender<SessionEvent>,
    slot: Arc<Mutex<Option<u64>>>,
) {
    let conn_id = shared.conn_id;
    let forward = |event: RelayEvent| {
        let events = events.clone();
        async move { events.send(SessionEvent::Relay { conn_id, event }).await }
    };

    'pump: loop {
        tokio::select! {
            biased;

            msg = control_rx.recv() => match msg {
                Some(RelayMessage::Paired) => {
                    if forward(RelayEvent::PairingAck).await.is_err() {
                        break 'pump;
                    }
                }
                Some(RelayMessage::CaptureResult(data)) => {
                    if forward(RelayEvent::CaptureResult(data)).await.is_err() {
                        break 'pump;
                    }
                }
                Some(RelayMessage::Disconnect) | None => {
                    let _ = forward(RelayEvent::Disconnected).await;
                    break 'pump;
                }
                Some(other) => {
                    tracing::warn!(conn_id = conn_id, ?other, "Unexpected inbound relay message");
                }
            },

            _ = shared.notify.notified() => {
                if shared.is_closed() {
                    break 'pump;
                }
                loop {
                    // Guard must drop before the forward await
                    let frame = shared.lock_preview().pop_front();
                    let Some(frame) = frame else { break };
                    if forward(RelayEvent::Preview(frame)).await.is_err() {
                        break 'pump;
                    }
                }
            }
        }
    }

    shared.close();
    release_slot(&slot, conn_id).await;
    tracing::debug!(conn_id = conn_id, "Relay connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn recv_relay(events: &mut mpsc::Receiver<SessionEvent>) -> (u64, RelayEvent) {
        match events.recv().await {
            Some(SessionEvent::Relay { conn_id, event }) => (conn_id, event),
            other => panic!("expected relay event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_connection_rejected() {
        let relay = MediaRelay::new();
        let (tx, _rx) = mpsc::channel(32);

        let (_link, _handle) = relay.accept(tx.clone()).await.unwrap();
        assert!(relay.is_busy().await);

        let result = relay.accept(tx).await;
        assert!(matches!(result, Err(RelayError::Busy)));
    }

    #[tokio::test]
    async fn test_slot_freed_after_customer_close() {
        let relay = MediaRelay::new();
        let (tx, mut rx) = mpsc::channel(32);

        let (link, _handle) = relay.accept(tx.clone()).await.unwrap();
        link.close().await;

        let (conn_id, event) = recv_relay(&mut rx).await;
        assert_eq!(conn_id, 1);
        assert!(matches!(event, RelayEvent::Disconnected));

        // Slot is free again
        tokio::task::yield_now().await;
        assert!(relay.accept(tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_link_reports_disconnect() {
        let relay = MediaRelay::new();
        let (tx, mut rx) = mpsc::channel(32);

        let (link, _handle) = relay.accept(tx).await.unwrap();
        drop(link);

        let (_, event) = recv_relay(&mut rx).await;
        assert!(matches!(event, RelayEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_control_messages_forwarded_in_order() {
        let relay = MediaRelay::new();
        let (tx, mut rx) = mpsc::channel(32);

        let (link, _handle) = relay.accept(tx).await.unwrap();
        link.pairing_ack().await.unwrap();
        link.send_capture_result(Bytes::from_static(b"img")).await.unwrap();

        let (_, first) = recv_relay(&mut rx).await;
        assert!(matches!(first, RelayEvent::PairingAck));
        let (_, second) = recv_relay(&mut rx).await;
        assert_eq!(second, RelayEvent::CaptureResult(Bytes::from_static(b"img")));
    }

    #[tokio::test]
    async fn test_preview_backpressure_drops_oldest() {
        let config = RelayConfig::default().preview_queue_depth(4);
        let relay = MediaRelay::with_config(config);
        let (tx, mut rx) = mpsc::channel(32);

        let (link, _handle) = relay.accept(tx).await.unwrap();

        // send_preview is synchronous, so on a current-thread runtime the
        // pump cannot drain between these calls.
        for i in 0u8..10 {
            link.send_preview(Bytes::copy_from_slice(&[i])).unwrap();
        }
        assert_eq!(link.dropped_previews(), 6);

        // The four freshest frames survive, in order
        for expected in 6u8..10 {
            let (_, event) = recv_relay(&mut rx).await;
            assert_eq!(event, RelayEvent::Preview(Bytes::copy_from_slice(&[expected])));
        }
    }

    #[tokio::test]
    async fn test_capture_cmd_reaches_customer() {
        let relay = MediaRelay::new();
        let (tx, _rx) = mpsc::channel(32);

        let (mut link, handle) = relay.accept(tx).await.unwrap();
        handle.send_capture_cmd().await.unwrap();

        assert_eq!(link.next_command().await, Some(RelayMessage::CaptureCmd));
    }

    #[tokio::test]
    async fn test_release_tells_customer_and_frees_slot() {
        let relay = MediaRelay::new();
        let (tx, _rx) = mpsc::channel(32);

        let (mut link, handle) = relay.accept(tx.clone()).await.unwrap();
        handle.release().await;

        assert_eq!(link.next_command().await, Some(RelayMessage::Disconnect));
        assert!(!relay.is_busy().await);

        // Preview sends after release are rejected
        assert_eq!(
            link.send_preview(Bytes::from_static(&[0])),
            Err(RelayError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_stale_release_cannot_evict_newer_connection() {
        let relay = MediaRelay::new();
        let (tx, _rx) = mpsc::channel(32);

        let (_link1, handle1) = relay.accept(tx.clone()).await.unwrap();
        handle1.release().await;

        let (_link2, _handle2) = relay.accept(tx.clone()).await.unwrap();
        assert!(relay.is_busy().await);

        // Releasing the dead handle again must not free the new slot
        handle1.release().await;
        assert!(relay.is_busy().await);
        assert!(matches!(relay.accept(tx).await, Err(RelayError::Busy)));
    }

    #[tokio::test]
    async fn test_rapid_connect_disconnect_cycles() {
        let relay = MediaRelay::new();
        let (tx, mut rx) = mpsc::channel(256);

        for _ in 0..50 {
            let (link, _handle) = relay.accept(tx.clone()).await.unwrap();
            // While active, a competing connection always sees Busy
            assert!(matches!(relay.accept(tx.clone()).await, Err(RelayError::Busy)));
            link.close().await;
            let (_, event) = recv_relay(&mut rx).await;
            assert!(matches!(event, RelayEvent::Disconnected));
            tokio::task::yield_now().await;
        }

        assert!(!relay.is_busy().await);
    }
}
