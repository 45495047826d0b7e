//! Kiosk-side booth runtime
//!
//! Wires one physical booth together: registration with the presence
//! registry, the recurring heartbeat task, the media relay, and the session
//! orchestrator. The handle is also the kiosk surface: the touchscreen
//! actions (capture, approve, retake, reset) are injected here into the
//! orchestrator's event queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, RwLock};

use crate::capability::{PaymentCapability, PrintCapability};
use crate::error::{Error, Result};
use crate::registry::{Availability, BoothId, PresenceRegistry, RegistryError};
use crate::relay::{CustomerLink, MediaRelay, RelayConfig, RelayError};
use crate::session::{
    OrchestratorHandle, SessionConfig, SessionEvent, SessionOrchestrator, SessionSnapshot,
    StatusReporter,
};

/// Availability reporter backed by the presence registry
///
/// Holds the booth id behind a lock because the heartbeat task may
/// re-register (fresh id) after a registry restart. Report failures are
/// logged and swallowed: losing a status update must never kill a session.
struct RegistryReporter {
    registry: Arc<PresenceRegistry>,
    booth_id: Arc<RwLock<BoothId>>,
}

#[async_trait]
impl StatusReporter for RegistryReporter {
    async fn report_availability(&self, availability: Availability) {
        let id = *self.booth_id.read().await;
        if let Err(e) = self.registry.set_availability(id, availability).await {
            tracing::warn!(booth = %id, error = %e, "Availability report failed");
        }
    }
}

/// A running booth: orchestrator, relay and heartbeat wired together
pub struct BoothHandle {
    booth_id: Arc<RwLock<BoothId>>,
    relay: Arc<MediaRelay>,
    orchestrator: OrchestratorHandle,
    orchestrator_task: tokio::task::JoinHandle<()>,
    heartbeat_task: tokio::task::JoinHandle<()>,
}

impl BoothHandle {
    /// Register with the registry and start the booth
    pub async fn start(
        name: impl Into<String>,
        address: impl Into<String>,
        registry: Arc<PresenceRegistry>,
        payment: Arc<dyn PaymentCapability>,
        printer: Arc<dyn PrintCapability>,
        session_config: SessionConfig,
        relay_config: RelayConfig,
    ) -> Result<Self> {
        let name = name.into();
        let address = address.into();

        let id = registry.register(name.clone(), address.clone()).await?;
        let booth_id = Arc::new(RwLock::new(id));

        let reporter = Arc::new(RegistryReporter {
            registry: Arc::clone(&registry),
            booth_id: Arc::clone(&booth_id),
        });

        let (orchestrator, orchestrator_task) =
            SessionOrchestrator::spawn(id, session_config, payment, printer, reporter);

        let heartbeat_task = spawn_heartbeat_task(
            Arc::clone(&registry),
            Arc::clone(&booth_id),
            name,
            address,
        );

        Ok(Self {
            booth_id,
            relay: Arc::new(MediaRelay::with_config(relay_config)),
            orchestrator,
            orchestrator_task,
            heartbeat_task,
        })
    }

    /// Current booth id (may change if the heartbeat re-registered)
    pub async fn booth_id(&self) -> BoothId {
        *self.booth_id.read().await
    }

    /// Admit a customer device
    ///
    /// Fails with `RelayError::Busy` while another customer is connected;
    /// the caller should pick a different booth via the directory.
    pub async fn connect_customer(&self) -> Result<CustomerLink> {
        let events = self.orchestrator.events();
        let (link, conn) = self.relay.accept(events.clone()).await?;
        self.send_event(&events, SessionEvent::Connected { conn }).await?;
        Ok(link)
    }

    /// Serve a remote customer device over a framed byte stream
    ///
    /// Runs until the device disconnects or the session releases the
    /// connection. While another customer is connected the device is
    /// answered with a `Busy` frame and the call fails with
    /// `RelayError::Busy`.
    pub async fn serve_customer<S>(&self, stream: S) -> Result<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite,
    {
        let events = self.orchestrator.events();
        crate::relay::serve_connection(&self.relay, events, stream).await?;
        Ok(())
    }

    /// Kiosk surface: trigger the capture
    pub async fn request_capture(&self) -> Result<()> {
        self.send(SessionEvent::CaptureRequested).await
    }

    /// Kiosk surface: customer approved the captured image
    pub async fn approve(&self) -> Result<()> {
        self.send(SessionEvent::Approve).await
    }

    /// Kiosk surface: customer asked to retake
    pub async fn retake(&self) -> Result<()> {
        self.send(SessionEvent::Retake).await
    }

    /// Kiosk surface: dismiss the done screen early
    pub async fn reset(&self) -> Result<()> {
        self.send(SessionEvent::Reset).await
    }

    /// Observe session state changes
    pub fn session_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.orchestrator.watch()
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.orchestrator.snapshot()
    }

    /// Stop the booth, releasing its timers and tasks
    ///
    /// The registry entry stays; the sweep marks it offline once heartbeats
    /// stop arriving.
    pub async fn shutdown(self) {
        let id = *self.booth_id.read().await;
        self.heartbeat_task.abort();
        self.orchestrator_task.abort();
        tracing::info!(booth = %id, "Booth shut down");
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        let events = self.orchestrator.events();
        self.send_event(&events, event).await
    }

    async fn send_event(
        &self,
        events: &mpsc::Sender<SessionEvent>,
        event: SessionEvent,
    ) -> Result<()> {
        events
            .send(event)
            .await
            .map_err(|_| Error::Relay(RelayError::ChannelClosed))
    }
}

/// Heartbeat the registry on its expected interval
///
/// A rejected id means the registry restarted and lost us; the booth
/// re-registers and carries on under the fresh id. Retry policy lives
/// here, on the reporting side, never in the registry.
fn spawn_heartbeat_task(
    registry: Arc<PresenceRegistry>,
    booth_id: Arc<RwLock<BoothId>>,
    name: String,
    address: String,
) -> tokio::task::JoinHandle<()> {
    let interval = registry.config().heartbeat_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let id = *booth_id.read().await;
            match registry.heartbeat(id).await {
                Ok(()) => {}
                Err(RegistryError::BoothNotFound(_)) => {
                    tracing::warn!(booth = %id, "Registry lost us, re-registering");
                    match registry.register(name.clone(), address.clone()).await {
                        Ok(new_id) => {
                            *booth_id.write().await = new_id;
                            tracing::info!(booth = %new_id, "Re-registered");
                        }
                        Err(e) => {
                            tracing::error!(booth = %id, error = %e, "Re-registration failed");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(booth = %id, error = %e, "Heartbeat failed");
                }
            }
        }
    })
}
