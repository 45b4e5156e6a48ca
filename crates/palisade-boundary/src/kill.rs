//! Hard-kill timer.
//!
//! The kill switch is the last resort when a drain stalls: each faulting
//! request arms a one-shot timer, and any one of them firing terminates
//! the process with a non-zero exit status. The timer lives in a detached
//! task, so it cannot keep the process alive once everything else has
//! finished (it is advisory, not a keep-alive), and it is never
//! cancelled on a graceful drain.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Arms per-fault termination timers.
///
/// Clones share the same arm counter and terminate action.
#[derive(Clone)]
pub struct KillSwitch {
    armed: Arc<AtomicUsize>,
    action: Arc<dyn Fn() + Send + Sync>,
}

impl KillSwitch {
    /// Creates a kill switch that exits the process with status 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_action(|| std::process::exit(1))
    }

    /// Creates a kill switch with a custom terminate action.
    ///
    /// Intended for tests and embedders that manage process exit
    /// themselves.
    #[must_use]
    pub fn with_action(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            armed: Arc::new(AtomicUsize::new(0)),
            action: Arc::new(action),
        }
    }

    /// Arms a one-shot timer that runs the terminate action after
    /// `after`, unconditionally.
    ///
    /// Multiple arms stack: each fault arms its own timer and any of them
    /// can fire.
    pub fn arm(&self, after: Duration) {
        self.armed.fetch_add(1, Ordering::SeqCst);
        let action = Arc::clone(&self.action);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            action();
        });
    }

    /// Returns how many timers have been armed.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.armed.load(Ordering::SeqCst)
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("armed", &self.armed())
            .finish()
    }
}
