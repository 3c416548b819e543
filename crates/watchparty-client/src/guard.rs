//! Echo-suppression guard.
//!
//! Player notifications arrive asynchronously relative to the call that
//! caused them, so after applying a remote command the guard stays armed for
//! a short quiescence window. Any PLAYING/PAUSED notification seen while it
//! is armed is treated as an icon update only and is never re-broadcast.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiescence window after a remote-originated mutation.
pub const SUPPRESSION_WINDOW: Duration = Duration::from_millis(100);

/// A deadline-based suppression flag. Callers pass `now` explicitly.
#[derive(Debug, Clone)]
pub struct SuppressionGuard {
    window: Duration,
    armed_until: Option<Instant>,
}

impl Default for SuppressionGuard {
    fn default() -> Self {
        Self::new(SUPPRESSION_WINDOW)
    }
}

impl SuppressionGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_until: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the guard until `now + window`. Re-arming never shortens an
    /// existing deadline.
    pub fn arm(&mut self, now: Instant) {
        let until = now + self.window;
        self.armed_until = Some(match self.armed_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// Disarm immediately.
    pub fn disarm(&mut self) {
        self.armed_until = None;
    }

    /// Whether notifications observed at `now` must be swallowed.
    pub fn is_armed(&self, now: Instant) -> bool {
        self.armed_until.is_some_and(|until| now < until)
    }

    /// When the guard disarms on its own, if armed.
    pub fn armed_until(&self) -> Option<Instant> {
        self.armed_until
    }

    /// Arm, then run `action` synchronously. The guard stays armed for the
    /// rest of the window after `action` returns.
    pub fn with_suppression<R>(&mut self, now: Instant, action: impl FnOnce() -> R) -> R {
        self.arm(now);
        action()
    }
}
