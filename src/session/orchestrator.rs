//! Session orchestrator
//!
//! One orchestrator runs per booth and owns that booth's transaction
//! lifecycle end to end: pairing, preview, capture, review, payment, print,
//! reset. All inputs (relay traffic, kiosk surface actions, capability
//! results, timer expiries) are serialized through a single event queue,
//! so exactly one transition is evaluated at a time and no lock guards the
//! session itself. Booths run fully independent orchestrators.
//!
//! Two rules hold in every phase:
//!
//! - every non-idle phase has a bounded path back to idle (disconnect,
//!   timeout, or retry exhaustion), so a booth can never be left stuck;
//! - payment and print are invoked only from their dedicated phase, and
//!   their results carry the session generation at call time, so a result
//!   arriving after a reset is recognized as stale and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::capability::{CapabilityError, PaymentCapability, PrintCapability};
use crate::registry::{Availability, BoothId};
use crate::relay::channel::RelayHandle;

use super::config::SessionConfig;
use super::event::{RelayEvent, SessionEvent};
use super::state::{FailureKind, ImageRef, Session, SessionPhase, SessionSnapshot};

/// Event queue depth per booth
const EVENT_QUEUE_DEPTH: usize = 64;

/// Sink for booth availability transitions
///
/// The orchestrator reports busy on pairing and idle on reset so the
/// directory never routes a new customer to a booth mid-transaction.
/// Implementations must swallow transport errors: a failed report is logged,
/// never fatal to the booth.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report_availability(&self, availability: Availability);
}

/// Handle to a running orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    events: mpsc::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl OrchestratorHandle {
    /// Sender for the booth's event queue
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    /// Observe session state changes (what a kiosk screen renders)
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// The per-booth state machine driver
pub struct SessionOrchestrator {
    booth: BoothId,
    config: SessionConfig,
    session: Session,
    /// Relay binding of the active session; `None` while idle
    conn: Option<RelayHandle>,
    payment: Arc<dyn PaymentCapability>,
    printer: Arc<dyn PrintCapability>,
    reporter: Arc<dyn StatusReporter>,
    /// Loopback sender for capability outcomes
    events_tx: mpsc::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionOrchestrator {
    /// Create an orchestrator and its event queue
    pub fn new(
        booth: BoothId,
        config: SessionConfig,
        payment: Arc<dyn PaymentCapability>,
        printer: Arc<dyn PrintCapability>,
        reporter: Arc<dyn StatusReporter>,
    ) -> (Self, mpsc::Receiver<SessionEvent>, OrchestratorHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let session = Session::idle();
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let handle = OrchestratorHandle {
            events: events_tx.clone(),
            snapshot: snapshot_rx,
        };
        let orchestrator = Self {
            booth,
            config,
            session,
            conn: None,
            payment,
            printer,
            reporter,
            events_tx,
            snapshot_tx,
        };

        (orchestrator, events_rx, handle)
    }

    /// Create and spawn an orchestrator task
    pub fn spawn(
        booth: BoothId,
        config: SessionConfig,
        payment: Arc<dyn PaymentCapability>,
        printer: Arc<dyn PrintCapability>,
        reporter: Arc<dyn StatusReporter>,
    ) -> (OrchestratorHandle, tokio::task::JoinHandle<()>) {
        let (orchestrator, events_rx, handle) =
            Self::new(booth, config, payment, printer, reporter);
        let task = tokio::spawn(orchestrator.run(events_rx));
        (handle, task)
    }

    /// Drive the state machine until the event queue closes
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        loop {
            let deadline = self.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                _ = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => self.on_deadline().await,
            }

            self.publish();
        }

        // Queue closed: release the relay binding so the booth is not left
        // holding a customer connection.
        if let Some(conn) = self.conn.take() {
            conn.release().await;
        }
    }

    /// Next timer expiry for the current phase, if any
    fn deadline(&self) -> Option<Instant> {
        let session = &self.session;
        let inactivity = session.last_activity + self.config.inactivity_timeout;

        match session.phase {
            SessionPhase::Idle => None,
            SessionPhase::Done => Some(session.entered_at + self.config.done_display_timeout),
            SessionPhase::Captured => {
                let capture = session.entered_at + self.config.capture_wait;
                Some(capture.min(inactivity))
            }
            // Aborted resolves synchronously inside abort(), the loop never
            // observes it; treated as already expired for completeness.
            SessionPhase::Aborted => Some(Instant::now()),
            _ => Some(inactivity),
        }
    }

    async fn on_deadline(&mut self) {
        let now = Instant::now();
        match self.session.phase {
            SessionPhase::Idle => {}
            SessionPhase::Done => self.finish().await,
            SessionPhase::Captured
                if now >= self.session.entered_at + self.config.capture_wait =>
            {
                self.abort("capture payload did not arrive").await;
            }
            _ => self.abort("inactivity timeout").await,
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { conn } => self.on_connected(conn).await,
            SessionEvent::Relay { conn_id, event } => {
                if self.conn.as_ref().map(RelayHandle::conn_id) != Some(conn_id) {
                    tracing::debug!(
                        booth = %self.booth,
                        conn_id = conn_id,
                        event = ?event,
                        "Relay event from a replaced connection discarded"
                    );
                    return;
                }
                match event {
                    RelayEvent::PairingAck => self.on_pairing_ack(),
                    RelayEvent::Preview(frame) => self.on_preview(frame.len()),
                    RelayEvent::CaptureResult(data) => self.on_capture_result(data),
                    RelayEvent::Disconnected => self.abort("customer disconnected").await,
                }
            }
            SessionEvent::CaptureRequested => self.on_capture_requested().await,
            SessionEvent::Approve => self.on_approve(),
            SessionEvent::Retake => self.on_retake(),
            SessionEvent::Reset => self.on_reset().await,
            SessionEvent::PaymentOutcome { generation, success } => {
                self.on_payment_outcome(generation, success).await;
            }
            SessionEvent::PrintOutcome { generation, success } => {
                self.on_print_outcome(generation, success).await;
            }
        }
    }

    async fn on_connected(&mut self, conn: RelayHandle) {
        if !self.session.phase.is_idle() {
            // The relay admits one connection at a time; this only happens
            // if an admission raced a reset. Refuse rather than queue.
            tracing::warn!(
                booth = %self.booth,
                phase = ?self.session.phase,
                "Connection refused: booth not idle"
            );
            conn.release().await;
            return;
        }

        self.conn = Some(conn);
        self.session.begin();
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            "Session started, pairing"
        );
        self.reporter.report_availability(Availability::Busy).await;
    }

    fn on_pairing_ack(&mut self) {
        if self.session.phase != SessionPhase::Pairing {
            self.reject("pairing ack");
            return;
        }
        self.session.touch();
        self.session.enter(SessionPhase::Streaming);
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            "Pairing acknowledged, preview streaming"
        );
    }

    fn on_preview(&mut self, size: usize) {
        // Preview frames count as client traffic in any non-idle phase;
        // display concerns live outside the orchestrator.
        self.session.touch();
        self.session.preview_frames += 1;
        tracing::trace!(
            booth = %self.booth,
            frames = self.session.preview_frames,
            size = size,
            "Preview frame"
        );
    }

    fn on_capture_result(&mut self, data: bytes::Bytes) {
        if self.session.phase != SessionPhase::Captured {
            self.reject("capture payload");
            return;
        }
        self.session.touch();
        let image = ImageRef::new(data);
        if !self.session.set_image(image) {
            tracing::warn!(booth = %self.booth, "Duplicate capture payload dropped");
            return;
        }
        self.session.enter(SessionPhase::Review);
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            "Capture received, reviewing"
        );
    }

    async fn on_capture_requested(&mut self) {
        if self.session.phase != SessionPhase::Streaming {
            self.reject("capture request");
            return;
        }
        let Some(conn) = &self.conn else {
            self.abort("no relay binding for capture").await;
            return;
        };
        if conn.send_capture_cmd().await.is_err() {
            self.abort("relay closed while sending capture directive").await;
            return;
        }
        self.session.touch();
        self.session.enter(SessionPhase::Captured);
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            wait_secs = self.config.capture_wait.as_secs(),
            "Capture directive sent, awaiting payload"
        );
    }

    fn on_approve(&mut self) {
        if self.session.phase != SessionPhase::Review {
            self.reject("approval");
            return;
        }
        self.session.touch();
        self.session.failure = None;
        self.session.payment_attempts += 1;
        self.session.enter(SessionPhase::PaymentPending);
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            attempt = self.session.payment_attempts,
            "Image approved, charging"
        );
        self.spawn_charge();
    }

    fn on_retake(&mut self) {
        if self.session.phase != SessionPhase::Review {
            self.reject("retake");
            return;
        }
        self.session.touch();
        self.session.clear_image();
        self.session.failure = None;
        self.session.enter(SessionPhase::Streaming);
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            "Retake, back to preview"
        );
    }

    async fn on_reset(&mut self) {
        match self.session.phase {
            SessionPhase::Done => self.finish().await,
            SessionPhase::Idle => {}
            _ => self.reject("reset"),
        }
    }

    async fn on_payment_outcome(&mut self, generation: u64, success: bool) {
        if generation != self.session.generation {
            tracing::info!(
                booth = %self.booth,
                stale_generation = generation,
                generation = self.session.generation,
                "Stale payment result discarded"
            );
            return;
        }
        if self.session.phase != SessionPhase::PaymentPending {
            self.reject("payment result");
            return;
        }

        if success {
            tracing::info!(
                booth = %self.booth,
                generation = self.session.generation,
                "Payment captured, printing"
            );
            self.session.print_attempts = 1;
            self.session.enter(SessionPhase::Printing);
            self.start_print().await;
        } else if self.session.payment_attempts >= self.config.max_payment_attempts {
            self.abort("payment attempts exhausted").await;
        } else {
            tracing::warn!(
                booth = %self.booth,
                generation = self.session.generation,
                attempt = self.session.payment_attempts,
                "Payment declined, back to review"
            );
            self.session.failure = Some(FailureKind::PaymentDeclined);
            self.session.enter(SessionPhase::Review);
        }
    }

    async fn on_print_outcome(&mut self, generation: u64, success: bool) {
        if generation != self.session.generation {
            tracing::info!(
                booth = %self.booth,
                stale_generation = generation,
                generation = self.session.generation,
                "Stale print result discarded"
            );
            return;
        }
        if self.session.phase != SessionPhase::Printing {
            self.reject("print result");
            return;
        }

        if success {
            tracing::info!(
                booth = %self.booth,
                generation = self.session.generation,
                "Print complete"
            );
            self.session.enter(SessionPhase::Done);
        } else if self.session.print_attempts < self.config.max_print_attempts {
            tracing::warn!(
                booth = %self.booth,
                generation = self.session.generation,
                attempt = self.session.print_attempts,
                "Print failed, retrying"
            );
            self.session.print_attempts += 1;
            self.start_print().await;
        } else {
            tracing::warn!(
                booth = %self.booth,
                generation = self.session.generation,
                "Print failed after retry, back to review"
            );
            self.session.failure = Some(FailureKind::PrintFailed);
            self.session.enter(SessionPhase::Review);
        }
    }

    /// Invoke the payment capability off the event loop
    ///
    /// The result is fed back through the queue, tagged with the current
    /// generation; a slow or hung provider stalls only its own session.
    fn spawn_charge(&self) {
        let payment = Arc::clone(&self.payment);
        let events = self.events_tx.clone();
        let generation = self.session.generation;
        let amount = self.config.print_price_cents;
        let bound = self.config.capability_timeout;
        let booth = self.booth;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(bound, payment.charge(amount)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CapabilityError::Timeout),
            };
            if let Err(e) = &outcome {
                tracing::warn!(booth = %booth, error = %e, "Payment failed");
            }
            let _ = events
                .send(SessionEvent::PaymentOutcome { generation, success: outcome.is_ok() })
                .await;
        });
    }

    async fn start_print(&mut self) {
        let Some(image) = self.session.image.clone() else {
            // Printing is only entered with an image held
            self.abort("no captured image at print time").await;
            return;
        };
        self.spawn_print(image);
    }

    /// Invoke the print capability off the event loop (same rules as payment)
    fn spawn_print(&self, image: ImageRef) {
        let printer = Arc::clone(&self.printer);
        let events = self.events_tx.clone();
        let generation = self.session.generation;
        let bound = self.config.capability_timeout;
        let booth = self.booth;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(bound, printer.print(&image)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CapabilityError::Timeout),
            };
            if let Err(e) = &outcome {
                tracing::warn!(booth = %booth, error = %e, "Print failed");
            }
            let _ = events
                .send(SessionEvent::PrintOutcome { generation, success: outcome.is_ok() })
                .await;
        });
    }

    /// Orderly completion: done screen expired or explicit reset
    async fn finish(&mut self) {
        tracing::info!(
            booth = %self.booth,
            generation = self.session.generation,
            "Session complete"
        );
        self.reset_to_idle().await;
    }

    /// Unconditional failure edge from any non-idle phase
    async fn abort(&mut self, reason: &str) {
        tracing::warn!(
            booth = %self.booth,
            generation = self.session.generation,
            phase = ?self.session.phase,
            reason = reason,
            "Session aborted"
        );
        self.session.enter(SessionPhase::Aborted);
        self.publish();
        self.reset_to_idle().await;
    }

    async fn reset_to_idle(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.release().await;
        }
        self.session.reset();
        self.reporter.report_availability(Availability::Idle).await;
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.session.snapshot());
    }

    fn reject(&self, what: &str) {
        tracing::warn!(
            booth = %self.booth,
            phase = ?self.session.phase,
            "Out-of-order {} rejected",
            what
        );
    }
}
