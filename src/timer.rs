//! The rebase hysteresis timer.
//!
//! Grounded on `original_source/utils/timer.go` and the call sites in
//! `original_source/kraken_grid/bot/websocket.go` (`timer.Start()` /
//! `timer.IsExpired()` / `timer.Reset()`). Owned exclusively by the
//! Dispatcher task, so it needs no internal synchronization.

use std::time::{Duration, Instant};

/// A one-shot hysteresis timer: arms once when price first deviates past the
/// threshold, and reports expired once `interval` has elapsed since arming.
#[derive(Debug)]
pub struct RebaseTimer {
    interval: Duration,
    armed_at: Option<Instant>,
}

impl RebaseTimer {
    /// Create a timer that expires `interval` after it is armed.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed_at: None,
        }
    }

    /// Arm the timer if it is not already armed. Idempotent: a second call
    /// while already armed does not push `armed_at` forward.
    pub fn start(&mut self) {
        if self.armed_at.is_none() {
            self.armed_at = Some(Instant::now());
        }
    }

    /// Clear the armed state.
    pub fn reset(&mut self) {
        self.armed_at = None;
    }

    /// Whether the timer is armed and `interval` has elapsed since arming.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.armed_at {
            Some(armed_at) => Instant::now().duration_since(armed_at) > self.interval,
            None => false,
        }
    }

    /// Whether the timer is currently armed (for diagnostics/tests).
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::RebaseTimer;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn unarmed_timer_never_expires() {
        let timer = RebaseTimer::new(Duration::from_millis(10));
        assert!(!timer.is_expired());
    }

    #[test]
    fn start_is_idempotent() {
        let mut timer = RebaseTimer::new(Duration::from_millis(50));
        timer.start();
        let first_armed_at = timer.armed_at;
        sleep(Duration::from_millis(5));
        timer.start();
        assert_eq!(first_armed_at, timer.armed_at);
    }

    #[test]
    fn expires_after_interval_elapses() {
        let mut timer = RebaseTimer::new(Duration::from_millis(20));
        timer.start();
        assert!(!timer.is_expired());
        sleep(Duration::from_millis(30));
        assert!(timer.is_expired());
    }

    #[test]
    fn reset_clears_armed_state() {
        let mut timer = RebaseTimer::new(Duration::from_millis(10));
        timer.start();
        timer.reset();
        assert!(!timer.is_armed());
        sleep(Duration::from_millis(15));
        assert!(!timer.is_expired());
    }
}
