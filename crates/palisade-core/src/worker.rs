//! Process-wide worker lifecycle state.
//!
//! A worker is either accepting work (`Active`) or winding down
//! (`Draining`). The transition is one-way and guarded by an atomic
//! compare-and-set: when many requests fault in the same scheduling
//! window, exactly one of them observes the transition and performs the
//! drain-initiation sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The two states of a worker's lifetime. There is no way back from
/// [`Draining`](WorkerState::Draining).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Accepting and serving work normally.
    Active,
    /// No longer accepting new work; in-flight work may still finish.
    Draining,
}

/// Shared, process-wide lifecycle flag.
///
/// Clones observe the same state.
///
/// # Example
///
/// ```rust
/// use palisade_core::{WorkerLifecycle, WorkerState};
///
/// let lifecycle = WorkerLifecycle::new();
/// assert_eq!(lifecycle.state(), WorkerState::Active);
///
/// assert!(lifecycle.begin_drain());
/// assert!(!lifecycle.begin_drain());
/// assert_eq!(lifecycle.state(), WorkerState::Draining);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkerLifecycle {
    draining: Arc<AtomicBool>,
}

impl WorkerLifecycle {
    /// Creates a lifecycle in the `Active` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        if self.is_draining() {
            WorkerState::Draining
        } else {
            WorkerState::Active
        }
    }

    /// Returns `true` if the worker is draining.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Attempts the `Active -> Draining` transition.
    ///
    /// Returns `true` for exactly one caller per process lifetime, no
    /// matter how many race; every later caller gets `false`.
    pub fn begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_active() {
        let lifecycle = WorkerLifecycle::new();
        assert_eq!(lifecycle.state(), WorkerState::Active);
        assert!(!lifecycle.is_draining());
    }

    #[test]
    fn test_begin_drain_once() {
        let lifecycle = WorkerLifecycle::new();
        assert!(lifecycle.begin_drain());
        assert!(!lifecycle.begin_drain());
        assert!(!lifecycle.begin_drain());
        assert_eq!(lifecycle.state(), WorkerState::Draining);
    }

    #[test]
    fn test_clones_share_state() {
        let lifecycle = WorkerLifecycle::new();
        let clone = lifecycle.clone();

        assert!(clone.begin_drain());
        assert!(lifecycle.is_draining());
        assert!(!lifecycle.begin_drain());
    }

    #[test]
    fn test_concurrent_drain_has_single_winner() {
        let lifecycle = WorkerLifecycle::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lc = lifecycle.clone();
                std::thread::spawn(move || lc.begin_drain())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert!(lifecycle.is_draining());
    }
}
