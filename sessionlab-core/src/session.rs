//! Session policy: pure clock questions about a timestamp.
//!
//! All answers are computed in the session timezone from the second-of-day of
//! the local wall clock, so daylight-saving shifts move the UTC bounds but not
//! the local ones.

use crate::config::SessionConfig;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Where a timestamp falls relative to the entry rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Before the trading window opens.
    PreSession,
    /// Inside the trading window but inside a no-new-entry window.
    NoNewEntry,
    /// New entries allowed.
    Open,
    /// Forced-flatten window (and everything after it on that date).
    Flatten,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::PreSession => "before trading window",
            SessionPhase::NoNewEntry => "inside no-new-entry window",
            SessionPhase::Open => "open",
            SessionPhase::Flatten => "inside forced-flatten window",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionPolicy {
    config: SessionConfig,
}

impl SessionPolicy {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.config.timezone
    }

    /// Calendar date of `ts` in the session timezone.
    pub fn session_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.config.timezone).date_naive()
    }

    fn second_of_day(&self, ts: DateTime<Utc>) -> i64 {
        let local = ts.with_timezone(&self.config.timezone);
        i64::from(local.num_seconds_from_midnight())
    }

    pub fn phase(&self, ts: DateTime<Utc>) -> SessionPhase {
        let t = self.second_of_day(ts);
        if t >= self.config.flatten_start_secs() {
            SessionPhase::Flatten
        } else if t < self.config.trading_start_secs() {
            SessionPhase::PreSession
        } else if t < self.config.entry_open_secs() || t >= self.config.entry_close_secs() {
            SessionPhase::NoNewEntry
        } else {
            SessionPhase::Open
        }
    }

    /// Inside `[start + start_buffer, end - end_buffer)`.
    pub fn in_trading_window(&self, ts: DateTime<Utc>) -> bool {
        matches!(
            self.phase(ts),
            SessionPhase::NoNewEntry | SessionPhase::Open
        )
    }

    pub fn in_no_new_entry_window(&self, ts: DateTime<Utc>) -> bool {
        self.phase(ts) == SessionPhase::NoNewEntry
    }

    pub fn in_flatten_window(&self, ts: DateTime<Utc>) -> bool {
        self.phase(ts) == SessionPhase::Flatten
    }

    pub fn entries_allowed(&self, ts: DateTime<Utc>) -> bool {
        self.phase(ts) == SessionPhase::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn policy(tz: Tz) -> SessionPolicy {
        SessionPolicy::new(SessionConfig {
            session_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            session_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            start_buffer_minutes: 5,
            end_buffer_minutes: 10,
            no_new_entry_start_minutes: 10,
            no_new_entry_end_minutes: 20,
            timezone: tz,
        })
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn phases_across_the_day_utc() {
        let p = policy(chrono_tz::UTC);
        assert_eq!(p.phase(utc(9, 0)), SessionPhase::PreSession);
        assert_eq!(p.phase(utc(9, 34)), SessionPhase::PreSession);
        // trading window opens 09:35, entries at 09:45
        assert_eq!(p.phase(utc(9, 35)), SessionPhase::NoNewEntry);
        assert_eq!(p.phase(utc(9, 44)), SessionPhase::NoNewEntry);
        assert_eq!(p.phase(utc(9, 45)), SessionPhase::Open);
        assert_eq!(p.phase(utc(15, 29)), SessionPhase::Open);
        // flatten 15:50, entries stop 15:30
        assert_eq!(p.phase(utc(15, 30)), SessionPhase::NoNewEntry);
        assert_eq!(p.phase(utc(15, 49)), SessionPhase::NoNewEntry);
        assert_eq!(p.phase(utc(15, 50)), SessionPhase::Flatten);
        assert_eq!(p.phase(utc(17, 0)), SessionPhase::Flatten);
    }

    #[test]
    fn predicates_agree_with_phase() {
        let p = policy(chrono_tz::UTC);
        assert!(p.entries_allowed(utc(10, 0)));
        assert!(p.in_trading_window(utc(9, 40)));
        assert!(p.in_no_new_entry_window(utc(9, 40)));
        assert!(!p.entries_allowed(utc(9, 40)));
        assert!(p.in_flatten_window(utc(15, 55)));
        assert!(!p.in_trading_window(utc(15, 55)));
    }

    #[test]
    fn timezone_shifts_wall_clock() {
        // 14:45 UTC = 09:45 New York (EST, before DST on 2024-03-04)
        let p = policy(chrono_tz::America::New_York);
        assert_eq!(p.phase(utc(14, 45)), SessionPhase::Open);
        assert_eq!(p.phase(utc(9, 45)), SessionPhase::PreSession);
        assert_eq!(p.phase(utc(20, 50)), SessionPhase::Flatten);
    }

    #[test]
    fn session_date_uses_local_calendar() {
        let p = policy(chrono_tz::Asia::Tokyo);
        // 20:00 UTC on the 4th is 05:00 on the 5th in Tokyo
        let ts = Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap();
        assert_eq!(p.session_date(ts), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }
}
