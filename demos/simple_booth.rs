//! Simple booth demo: one booth, one simulated customer, full transaction
//!
//! Run with: cargo run --example simple_booth
//!
//! Starts an in-process presence registry and a single booth with stub
//! payment/print providers, then drives a simulated customer device through
//! the whole flow: discover → connect → pair → preview → capture → review →
//! approve → pay → print → reset. Watch the logs to follow the state
//! machine; set RUST_LOG=photobooth_rs=debug for the relay internals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use photobooth_rs::capability::{CapabilityError, PaymentCapability, PrintCapability};
use photobooth_rs::{
    BoothHandle, DirectoryClient, ImageRef, PresenceRegistry, RelayConfig, RelayMessage,
    SessionConfig, SessionPhase,
};

/// Stub providers: a short delay, then success
struct StubProvider;

#[async_trait]
impl PaymentCapability for StubProvider {
    async fn charge(&self, amount_cents: u32) -> Result<(), CapabilityError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        println!("[payment] charged {} cents", amount_cents);
        Ok(())
    }
}

#[async_trait]
impl PrintCapability for StubProvider {
    async fn print(&self, image: &ImageRef) -> Result<(), CapabilityError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        println!("[printer] printed {} bytes", image.len());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> photobooth_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photobooth_rs=info".into()),
        )
        .init();

    let registry = Arc::new(PresenceRegistry::new());
    let sweep = registry.spawn_sweep_task();

    let booth = BoothHandle::start(
        "pier-7",
        "10.0.0.7:9000",
        Arc::clone(&registry),
        Arc::new(StubProvider),
        Arc::new(StubProvider),
        SessionConfig::default().done_display_timeout(Duration::from_secs(1)),
        RelayConfig::default(),
    )
    .await?;

    // Customer side: discover an idle booth through the directory
    let directory = DirectoryClient::new(Arc::clone(&registry));
    let found = directory
        .find_available()
        .await
        .expect("the booth we just started should be listed");
    println!("[customer] found booth '{}' at {}", found.name, found.address);

    let mut link = booth.connect_customer().await?;
    link.pairing_ack().await?;

    // Stream a few preview frames, then ask for the capture
    for i in 0u8..5 {
        link.send_preview(Bytes::from(vec![i; 1024]))?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    booth.request_capture().await?;

    // The booth tells the device to take the high-resolution shot
    if link.next_command().await == Some(RelayMessage::CaptureCmd) {
        link.send_capture_result(Bytes::from(vec![0xFF; 128 * 1024]))
            .await?;
    }

    // Customer reviews and approves; payment and print run on the booth
    let mut state = booth.session_state();
    while state.borrow_and_update().phase != SessionPhase::Review {
        state.changed().await.expect("orchestrator running");
    }
    println!("[customer] reviewing capture, approving");
    booth.approve().await?;

    while state.borrow_and_update().phase != SessionPhase::Idle {
        state.changed().await.expect("orchestrator running");
    }
    println!("[booth] transaction complete, booth idle again");

    sweep.abort();
    booth.shutdown().await;
    Ok(())
}
