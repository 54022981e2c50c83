//! Deferred, coalescing rebuild scheduling.

use std::time::{Duration, Instant};

/// Delay before the first full scan.
pub const DEFAULT_REBUILD_DELAY: Duration = Duration::from_millis(1000);

/// Single-threaded rebuild deferral.
///
/// At most one rebuild is ever pending. Requests made while one is pending
/// coalesce into it and do not push its due time back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildScheduler {
    delay: Duration,
    due_at: Option<Instant>,
}

impl Default for RebuildScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REBUILD_DELAY)
    }
}

impl RebuildScheduler {
    /// Idle scheduler that fires `delay` after a request.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            due_at: None,
        }
    }

    /// Deferral applied to each request.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Request a rebuild at `now + delay`.
    ///
    /// Returns `false` if the request coalesced into a pending one.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.due_at.is_some() {
            return false;
        }
        self.due_at = Some(now + self.delay);
        true
    }

    /// Whether a rebuild is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// Consume the pending rebuild if it is due.
    ///
    /// Returns `true` exactly once per scheduled rebuild.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due_at {
            Some(due) if due <= now => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    /// Time left before the pending rebuild is due, zero if overdue.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.due_at.map(|due| due.saturating_duration_since(now))
    }

    /// Drops a pending request.
    pub fn cancel(&mut self) {
        self.due_at = None;
    }
}
