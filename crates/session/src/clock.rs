use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Source of local wall-clock time. Every ledger timestamp and deadline comparison in a
/// session reads the same clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Deadline for one session. `expired` latches: once set it never clears.
#[derive(Debug, Clone, Serialize)]
pub struct SessionClock {
    start: NaiveDateTime,
    limit_seconds: u64,
    expired: bool,
}

impl SessionClock {
    pub fn new(start: NaiveDateTime, limit_seconds: u64) -> Self {
        Self {
            start,
            limit_seconds,
            expired: false,
        }
    }

    #[must_use]
    pub const fn limit_seconds(&self) -> u64 {
        self.limit_seconds
    }

    /// Whole seconds left at `now`, never negative. Zero once expired.
    #[must_use]
    pub fn remaining(&self, now: NaiveDateTime) -> u64 {
        if self.expired {
            return 0;
        }
        let elapsed = (now - self.start).num_seconds().max(0) as u64;
        self.limit_seconds.saturating_sub(elapsed)
    }

    /// Compare against `now` and latch expiry. Returns the (possibly updated) flag.
    pub fn check(&mut self, now: NaiveDateTime) -> bool {
        if !self.expired && self.remaining(now) == 0 {
            self.expired = true;
        }
        self.expired
    }

    pub fn expire(&mut self) {
        self.expired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn expiry_latches() {
        let clock = ManualClock::new(t0());
        let mut deadline = SessionClock::new(clock.now(), 60);

        clock.advance_secs(59);
        assert!(!deadline.check(clock.now()));
        assert_eq!(deadline.remaining(clock.now()), 1);

        clock.advance_secs(1);
        assert!(deadline.check(clock.now()));
        // A clock moving backwards does not revive the session
        assert!(deadline.check(t0()));
        assert_eq!(deadline.remaining(t0()), 0);
    }

    #[test]
    fn remaining_before_start_is_capped_at_limit() {
        let deadline = SessionClock::new(t0(), 600);
        assert_eq!(deadline.remaining(t0() - Duration::seconds(30)), 600);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance_secs(10);
        assert_eq!(other.now(), t0() + Duration::seconds(10));
    }
}
