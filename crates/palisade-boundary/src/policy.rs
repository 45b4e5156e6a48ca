//! Drain timing policy.

use std::time::Duration;

/// Environment toggle selecting slow disconnect. Set to `1` to keep
/// accepting connections for a grace window after a fault before
/// disconnecting from the shared listener.
pub const SLOW_DISCONNECT_ENV: &str = "PALISADE_SLOW_DISCONNECT";

/// Default interval after which a faulted worker is forcibly terminated.
pub const DEFAULT_KILL_AFTER: Duration = Duration::from_secs(10);

/// Default grace window before disconnecting in slow-disconnect mode.
pub const DEFAULT_DISCONNECT_DELAY: Duration = Duration::from_secs(8);

/// Timing knobs for the drain sequence.
///
/// # Example
///
/// ```rust
/// use palisade_boundary::DrainPolicy;
///
/// let policy = DrainPolicy::new();
/// assert!(!policy.slow_disconnect());
/// ```
#[derive(Debug, Clone)]
pub struct DrainPolicy {
    slow_disconnect: bool,
    disconnect_delay: Duration,
    kill_after: Duration,
}

impl DrainPolicy {
    /// Creates the default policy: immediate disconnect, 8s grace window
    /// when slow disconnect is later enabled, 10s hard-kill interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slow_disconnect: false,
            disconnect_delay: DEFAULT_DISCONNECT_DELAY,
            kill_after: DEFAULT_KILL_AFTER,
        }
    }

    /// Builds a policy from the environment.
    ///
    /// `PALISADE_SLOW_DISCONNECT=1` selects slow disconnect; anything
    /// else (including absence) selects immediate disconnect.
    #[must_use]
    pub fn from_env() -> Self {
        let slow = std::env::var(SLOW_DISCONNECT_ENV).is_ok_and(|v| v == "1");
        Self::new().with_slow_disconnect(slow)
    }

    /// Enables or disables the slow-disconnect grace window.
    #[must_use]
    pub fn with_slow_disconnect(mut self, slow: bool) -> Self {
        self.slow_disconnect = slow;
        self
    }

    /// Overrides the slow-disconnect grace window.
    #[must_use]
    pub fn with_disconnect_delay(mut self, delay: Duration) -> Self {
        self.disconnect_delay = delay;
        self
    }

    /// Overrides the hard-kill interval.
    #[must_use]
    pub fn with_kill_after(mut self, after: Duration) -> Self {
        self.kill_after = after;
        self
    }

    /// Returns `true` if disconnect is delayed by the grace window.
    #[must_use]
    pub fn slow_disconnect(&self) -> bool {
        self.slow_disconnect
    }

    /// Returns the slow-disconnect grace window.
    #[must_use]
    pub fn disconnect_delay(&self) -> Duration {
        self.disconnect_delay
    }

    /// Returns the hard-kill interval.
    #[must_use]
    pub fn kill_after(&self) -> Duration {
        self.kill_after
    }
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self::new()
    }
}
