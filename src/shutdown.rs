//! Graceful shutdown and deadline coordination.
//!
//! [`ShutdownCoordinator`] is shared across tasks to detect Ctrl+C and request
//! early termination. [`StopSignal`] combines an optional coordinator with an
//! optional deadline so that every blocking point of a collection run (rate
//! waits, think-time, pacing, cool-down) can be cut short by either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

/// Coordinates graceful shutdown across async tasks.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    is_shutdown: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new() -> Self {
        Self {
            is_shutdown: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared coordinator wrapped in [`Arc`].
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Request shutdown. Notifies all registered waiters exactly once.
    pub fn request_shutdown(&self) {
        if !self.is_shutdown.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested. Returns immediately if already set.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a request in between is not missed.
        notified.as_mut().enable();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}

/// Deadline and/or shutdown handle bounding a collection run
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    deadline: Option<Instant>,
    shutdown: Option<SharedShutdown>,
}

impl StopSignal {
    /// A signal that never fires
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once `deadline` is reached
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fire when `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attach a shutdown handle if one is given
    pub fn with_optional_shutdown(self, shutdown: Option<SharedShutdown>) -> Self {
        match shutdown {
            Some(shutdown) => self.with_shutdown(shutdown),
            None => self,
        }
    }

    /// Configured deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline has passed or shutdown was requested
    pub fn is_triggered(&self) -> bool {
        let past_deadline = self
            .deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        let shut_down = self
            .shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false);
        past_deadline || shut_down
    }

    /// Sleep for `duration` unless the signal fires first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// clamped to the deadline or interrupted by shutdown.
    pub async fn pause(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }

        let target = Instant::now() + duration;
        let (wake_at, clamped) = match self.deadline {
            Some(deadline) if deadline < target => (deadline, true),
            _ => (target, false),
        };

        let completed = match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = sleep_until(wake_at) => true,
                    _ = shutdown.wait_for_shutdown() => false,
                }
            }
            None => {
                sleep_until(wake_at).await;
                true
            }
        };

        completed && !clamped
    }
}
