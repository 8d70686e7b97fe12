//! Cancellable periodic schedule.
//!
//! The pipeline never owns a thread or an event loop; the host drives
//! [`Ticker::poll`] and runs a refresh whenever it fires. Cancelling
//! deregisters the schedule for good: a cancelled ticker never fires
//! again, so no recurring wakeup can leak.

use std::time::{Duration, Instant};

/// A cooperatively polled periodic schedule.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
    cancelled: bool,
}

impl Ticker {
    /// Schedule the first fire one interval from `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
            cancelled: false,
        }
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval; the next fire is rescheduled from `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.next_due = now + interval;
    }

    /// Whether the schedule is due. Firing reschedules the next tick one
    /// interval from `now`; a cancelled ticker never fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled || now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    /// Deregister the schedule permanently.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether the schedule was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_the_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(200), start);
        assert!(!ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(199)));
        assert!(ticker.poll(start + Duration::from_millis(200)));
    }

    #[test]
    fn firing_reschedules_from_fire_time() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        assert!(ticker.poll(start + Duration::from_millis(150)));
        // Not due again until 150ms + interval.
        assert!(!ticker.poll(start + Duration::from_millis(200)));
        assert!(ticker.poll(start + Duration::from_millis(250)));
    }

    #[test]
    fn cancelled_ticker_never_fires() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(10), start);
        ticker.cancel();
        assert!(ticker.is_cancelled());
        assert!(!ticker.poll(start + Duration::from_secs(60)));
    }

    #[test]
    fn set_interval_reschedules() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100), start);
        ticker.set_interval(Duration::from_millis(10), start);
        assert!(ticker.poll(start + Duration::from_millis(10)));
    }
}
