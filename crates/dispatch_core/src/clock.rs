//! Time source abstraction: wall-clock for production, fixed clock for tests.
//!
//! Components never read ambient time directly; they receive a [`Clock`] so
//! plan dates, history keys, and drop-off timestamps are deterministic under
//! test.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current instant. All date keys derive from `now()`.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an explicit instant; `set` advances it between test steps.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Pin the clock to a date at midnight UTC.
    pub fn at_date(date: NaiveDate) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
        Self::new(midnight.and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock poisoned") = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_pinned_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 21).expect("valid date");
        let clock = FixedClock::at_date(date);
        assert_eq!(clock.today(), date);
    }

    #[test]
    fn fixed_clock_advances_on_set() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 21).expect("valid date");
        let clock = FixedClock::at_date(date);
        let later = date
            .succ_opt()
            .expect("valid date")
            .and_hms_opt(8, 30, 0)
            .expect("valid time")
            .and_utc();
        clock.set(later);
        assert_eq!(clock.now(), later);
        assert_eq!(clock.today(), date.succ_opt().expect("valid date"));
    }
}
