//! Injected wall clock.
//!
//! # Responsibility
//! - Provide "now" and "today" to sync components without hidden globals.
//! - Allow tests to move time deterministically.
//!
//! # Invariants
//! - `today()` is the calendar day of `now_ms()` in the clock's time zone.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Time source used by sync components.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in epoch milliseconds.
    fn now_ms(&self) -> i64;
    /// Current calendar day used for the daily recurring reset.
    fn today(&self) -> NaiveDate;
}

/// System clock; calendar days follow the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock; calendar days follow UTC.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Starts at UTC midnight of `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .map(|value| value.and_utc().timestamp_millis())
            .unwrap_or_default();
        Self::new(midnight)
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance_ms(days * MILLIS_PER_DAY);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.now_ms())
            .map(|value| value.date_naive())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock, MILLIS_PER_DAY};
    use chrono::NaiveDate;

    #[test]
    fn manual_clock_tracks_calendar_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let clock = ManualClock::at_date(day);
        assert_eq!(clock.today(), day);

        clock.advance_ms(MILLIS_PER_DAY - 1);
        assert_eq!(clock.today(), day);

        clock.advance_ms(1);
        assert_eq!(clock.today(), day.succ_opt().unwrap());
    }

    #[test]
    fn advance_days_moves_now() {
        let clock = ManualClock::new(1_000);
        clock.advance_days(2);
        assert_eq!(clock.now_ms(), 1_000 + 2 * MILLIS_PER_DAY);
    }
}
