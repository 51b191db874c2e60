//! Clock seam and end-of-day timer arming.
//!
//! The agent never reads the wall clock directly; it goes through [`Clock`]
//! so cycle gating and the unwind deadline are deterministic in tests.

use chrono::{DateTime, Utc};
use odte_core::calendar;
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Tokio instant of today's forced unwind. Already-passed deadlines fire
/// immediately.
pub fn eod_deadline<C: Clock>(clock: &C) -> Instant {
    let now = clock.now();
    let at = calendar::eod_unwind_at(now);
    let delta = (at - now).to_std().unwrap_or_default();
    Instant::now() + delta
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Settable clock for deterministic tests. Clones share the same time.
    #[derive(Clone)]
    pub struct FixedClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn past_deadline_fires_immediately() {
        // 15:30 ET on a June Tuesday, after the 15:10 unwind.
        let clock =
            testing::FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 19, 30, 0).unwrap());
        let deadline = eod_deadline(&clock);
        assert!(deadline <= Instant::now());
    }

    #[test]
    fn future_deadline_is_ahead_of_now() {
        // 13:00 ET, over two hours before the unwind.
        let clock =
            testing::FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 17, 0, 0).unwrap());
        let deadline = eod_deadline(&clock);
        assert!(deadline > Instant::now() + std::time::Duration::from_secs(7200));
    }
}
