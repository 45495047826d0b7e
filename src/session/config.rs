//! Session orchestrator configuration
//!
//! Every non-idle phase carries a bound. The values are tunable, but each
//! one must stay finite: an unbounded wait or retry count would let a dead
//! customer device hold the booth outside idle forever.

use std::time::Duration;

/// Configuration for a booth's session orchestrator
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on the wait for the high-resolution payload after a capture
    /// directive
    pub capture_wait: Duration,

    /// Abort after this long without inbound client traffic, in any
    /// non-idle phase
    pub inactivity_timeout: Duration,

    /// Bound on a single payment or print invocation
    pub capability_timeout: Duration,

    /// How long the done screen shows before the automatic reset
    pub done_display_timeout: Duration,

    /// Payment attempts allowed per session before aborting
    pub max_payment_attempts: u32,

    /// Print attempts per approval (the automatic retry included)
    pub max_print_attempts: u32,

    /// Price charged per print, in cents
    pub print_price_cents: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_wait: Duration::from_secs(10),
            inactivity_timeout: Duration::from_secs(60),
            capability_timeout: Duration::from_secs(15),
            done_display_timeout: Duration::from_secs(5),
            max_payment_attempts: 3,
            max_print_attempts: 2,
            print_price_cents: 500,
        }
    }
}

impl SessionConfig {
    /// Set the capture wait bound
    pub fn capture_wait(mut self, wait: Duration) -> Self {
        self.capture_wait = wait;
        self
    }

    /// Set the inactivity timeout
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Set the capability timeout
    pub fn capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    /// Set the done-screen display timeout
    pub fn done_display_timeout(mut self, timeout: Duration) -> Self {
        self.done_display_timeout = timeout;
        self
    }

    /// Set the payment attempt bound (minimum 1)
    pub fn max_payment_attempts(mut self, attempts: u32) -> Self {
        self.max_payment_attempts = attempts.max(1);
        self
    }

    /// Set the print attempt bound (minimum 1)
    pub fn max_print_attempts(mut self, attempts: u32) -> Self {
        self.max_print_attempts = attempts.max(1);
        self
    }

    /// Set the print price
    pub fn print_price_cents(mut self, cents: u32) -> Self {
        self.print_price_cents = cents;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();

        assert_eq!(config.capture_wait, Duration::from_secs(10));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(60));
        assert_eq!(config.capability_timeout, Duration::from_secs(15));
        assert_eq!(config.done_display_timeout, Duration::from_secs(5));
        assert_eq!(config.max_payment_attempts, 3);
        assert_eq!(config.max_print_attempts, 2);
    }

    #[test]
    fn test_builder_chaining() {
        let config = SessionConfig::default()
            .capture_wait(Duration::from_secs(5))
            .inactivity_timeout(Duration::from_secs(30))
            .capability_timeout(Duration::from_secs(8))
            .done_display_timeout(Duration::from_secs(2))
            .max_payment_attempts(5)
            .print_price_cents(750);

        assert_eq!(config.capture_wait, Duration::from_secs(5));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(30));
        assert_eq!(config.capability_timeout, Duration::from_secs(8));
        assert_eq!(config.done_display_timeout, Duration::from_secs(2));
        assert_eq!(config.max_payment_attempts, 5);
        assert_eq!(config.print_price_cents, 750);
    }

    #[test]
    fn test_attempt_bounds_floor() {
        let config = SessionConfig::default()
            .max_payment_attempts(0)
            .max_print_attempts(0);

        assert_eq!(config.max_payment_attempts, 1);
        assert_eq!(config.max_print_attempts, 1);
    }
}
