//! Session state machine data
//!
//! Tracks one customer transaction on one booth from pairing to print and
//! reset. The phase enum is the single source of truth; there are no side
//! boolean flags, so every event has a defined effect in every phase.

use bytes::Bytes;
use tokio::time::Instant;

/// Session lifecycle phase
///
/// ```text
/// Idle → Pairing → Streaming → Captured → Review → PaymentPending → Printing → Done → Idle
///                      ▲                    │ retake
///                      └────────────────────┘
/// Aborted: reached from any non-Idle phase (disconnect, timeout, retry
/// exhaustion), resolves straight back to Idle.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No customer; the booth advertises itself as available
    Idle,
    /// Connection admitted, waiting for the pairing ack
    Pairing,
    /// Live preview running, waiting for a capture request
    Streaming,
    /// Capture directive sent, waiting for the high-resolution payload
    Captured,
    /// Customer reviews the captured image
    Review,
    /// Payment capability in flight
    PaymentPending,
    /// Print capability in flight
    Printing,
    /// Transaction complete, showing the done screen
    Done,
    /// Absorbing failure edge; immediately resolves to Idle
    Aborted,
}

impl SessionPhase {
    /// Check if the booth is between transactions
    pub fn is_idle(&self) -> bool {
        *self == SessionPhase::Idle
    }
}

/// User-visible failure surfaced on the review screen
///
/// Failures become state rather than a dropped connection, so the customer
/// sees an actionable screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Payment declined or timed out; the customer may retry or retake
    PaymentDeclined,
    /// Print failed after the automatic retry
    PrintFailed,
}

/// Reference to a captured image
///
/// Cheap to clone: the payload is reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Raw capture payload as delivered by the relay
    pub data: Bytes,
}

impl ImageRef {
    /// Wrap a capture payload
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Complete state of one booth's transaction slot
#[derive(Debug)]
pub struct Session {
    /// Generation counter, bumped on every new pairing; tags capability
    /// calls so a result arriving after a reset is recognized as stale
    pub generation: u64,

    /// Current phase
    pub phase: SessionPhase,

    /// Captured image, set at most once per capture, cleared on retake
    pub image: Option<ImageRef>,

    /// Payment attempts made this session
    pub payment_attempts: u32,

    /// Print attempts made this session
    pub print_attempts: u32,

    /// Failure to surface on the review screen, if any
    pub failure: Option<FailureKind>,

    /// Time the current phase was entered
    pub entered_at: Instant,

    /// Time of the last inbound client traffic
    pub last_activity: Instant,

    /// Preview frames seen this session
    pub preview_frames: u64,
}

impl Session {
    /// Create the idle slot for a booth
    pub fn idle() -> Self {
        let now = Instant::now();
        Self {
            generation: 0,
            phase: SessionPhase::Idle,
            image: None,
            payment_attempts: 0,
            print_attempts: 0,
            failure: None,
            entered_at: now,
            last_activity: now,
            preview_frames: 0,
        }
    }

    /// Start a new transaction in the pairing phase
    pub fn begin(&mut self) {
        let now = Instant::now();
        self.generation += 1;
        self.phase = SessionPhase::Pairing;
        self.image = None;
        self.payment_attempts = 0;
        self.print_attempts = 0;
        self.failure = None;
        self.entered_at = now;
        self.last_activity = now;
        self.preview_frames = 0;
    }

    /// Move to a new phase
    pub fn enter(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.entered_at = Instant::now();
    }

    /// Record inbound client traffic, deferring the inactivity bound
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Store the captured image
    ///
    /// The reference is set at most once per capture; a payload arriving
    /// while one is already held is dropped.
    pub fn set_image(&mut self, image: ImageRef) -> bool {
        if self.image.is_some() {
            return false;
        }
        self.image = Some(image);
        true
    }

    /// Discard the captured image (retake)
    pub fn clear_image(&mut self) {
        self.image = None;
    }

    /// Return the slot to idle, keeping the generation so stale capability
    /// results from the finished transaction stay identifiable
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.phase = SessionPhase::Idle;
        self.image = None;
        self.payment_attempts = 0;
        self.print_attempts = 0;
        self.failure = None;
        self.entered_at = now;
        self.last_activity = now;
        self.preview_frames = 0;
    }

    /// Snapshot for observers
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            phase: self.phase,
            payment_attempts: self.payment_attempts,
            print_attempts: self.print_attempts,
            failure: self.failure,
            has_image: self.image.is_some(),
        }
    }
}

/// Cloneable view of a session, published on a watch channel
///
/// This is what a kiosk screen renders: the phase plus the failure flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session generation
    pub generation: u64,
    /// Current phase
    pub phase: SessionPhase,
    /// Payment attempts so far
    pub payment_attempts: u32,
    /// Print attempts so far
    pub print_attempts: u32,
    /// Failure to surface, if any
    pub failure: Option<FailureKind>,
    /// Whether a captured image is held
    pub has_image: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_bumps_generation_and_clears_state() {
        let mut session = Session::idle();
        assert!(session.phase.is_idle());

        session.begin();
        assert_eq!(session.generation, 1);
        assert_eq!(session.phase, SessionPhase::Pairing);

        session.enter(SessionPhase::Review);
        session.set_image(ImageRef::new(Bytes::from_static(b"img")));
        session.payment_attempts = 2;
        session.failure = Some(FailureKind::PaymentDeclined);
        session.reset();

        session.begin();
        assert_eq!(session.generation, 2);
        assert!(session.image.is_none());
        assert_eq!(session.payment_attempts, 0);
        assert!(session.failure.is_none());
    }

    #[test]
    fn test_image_set_at_most_once() {
        let mut session = Session::idle();
        session.begin();

        assert!(session.set_image(ImageRef::new(Bytes::from_static(b"first"))));
        assert!(!session.set_image(ImageRef::new(Bytes::from_static(b"second"))));
        assert_eq!(
            session.image,
            Some(ImageRef::new(Bytes::from_static(b"first")))
        );

        // Retake clears the slot and allows a fresh capture
        session.clear_image();
        assert!(session.set_image(ImageRef::new(Bytes::from_static(b"second"))));
    }

    #[test]
    fn test_reset_keeps_generation() {
        let mut session = Session::idle();
        session.begin();
        session.reset();

        assert!(session.phase.is_idle());
        assert_eq!(session.generation, 1);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut session = Session::idle();
        session.begin();
        session.enter(SessionPhase::Review);
        session.set_image(ImageRef::new(Bytes::from_static(b"img")));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Review);
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.has_image);
        assert!(snapshot.failure.is_none());
    }
}
