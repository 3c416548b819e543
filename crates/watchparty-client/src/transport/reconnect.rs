//! Fixed-delay reconnect state machine.
//!
//! Every closure schedules exactly one attempt `delay` later. There is no
//! backoff growth and no attempt cap; the link is expected to recover when
//! the relay comes back. A closure reported while an attempt is already
//! pending does not schedule a second one.

use std::time::Duration;

use tokio::time::Instant;
use watchparty_core::LinkState;

/// Delay between a closure and the next connect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    delay: Duration,
    state: LinkState,
    pending: Option<Instant>,
    attempts: u64,
}

impl Default for ReconnectSchedule {
    fn default() -> Self {
        Self::new(RECONNECT_DELAY)
    }
}

impl ReconnectSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: LinkState::Disconnected,
            pending: None,
            attempts: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Deadline of the scheduled attempt, if one is pending.
    pub fn pending(&self) -> Option<Instant> {
        self.pending
    }

    /// Total connect attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Whether the pending attempt is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|at| now >= at)
    }

    /// Start a connect attempt, consuming any pending deadline.
    pub fn begin_attempt(&mut self) -> u64 {
        self.pending = None;
        self.state = LinkState::Connecting;
        self.attempts += 1;
        self.attempts
    }

    pub fn on_open(&mut self) {
        self.state = LinkState::Connected;
        self.pending = None;
    }

    /// Record a closure (or failed attempt). Returns the new deadline, or
    /// `None` if an attempt was already scheduled.
    pub fn on_closed(&mut self, now: Instant) -> Option<Instant> {
        self.state = LinkState::Disconnected;
        if self.pending.is_some() {
            return None;
        }
        let at = now + self.delay;
        self.pending = Some(at);
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_schedules_one_attempt_at_delay() {
        let t0 = Instant::now();
        let mut sched = ReconnectSchedule::default();
        sched.begin_attempt();
        sched.on_open();
        assert_eq!(sched.state(), LinkState::Connected);

        let at = sched.on_closed(t0).unwrap();
        assert_eq!(at, t0 + Duration::from_millis(5000));
        assert_eq!(sched.state(), LinkState::Disconnected);
        assert!(!sched.is_due(t0 + Duration::from_millis(4999)));
        assert!(sched.is_due(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn duplicate_closures_do_not_reschedule() {
        let t0 = Instant::now();
        let mut sched = ReconnectSchedule::default();
        let first = sched.on_closed(t0);
        assert!(first.is_some());
        assert_eq!(sched.on_closed(t0 + Duration::from_millis(10)), None);
        assert_eq!(sched.pending(), first);
    }

    #[test]
    fn retries_are_unbounded_with_fixed_delay() {
        let mut now = Instant::now();
        let mut sched = ReconnectSchedule::default();
        for n in 1..=1000u64 {
            assert_eq!(sched.begin_attempt(), n);
            assert_eq!(sched.state(), LinkState::Connecting);
            let at = sched.on_closed(now).unwrap();
            assert_eq!(at - now, RECONNECT_DELAY);
            now = at;
        }
        assert_eq!(sched.attempts(), 1000);
    }

    #[test]
    fn open_clears_pending() {
        let t0 = Instant::now();
        let mut sched = ReconnectSchedule::new(Duration::from_millis(20));
        sched.on_closed(t0);
        sched.begin_attempt();
        sched.on_open();
        assert_eq!(sched.pending(), None);
        assert!(sched.on_closed(t0).is_some());
    }
}
