//! ReentryState: memory of the last closed trade, consulted by re-entry gating.

use super::trade::ExitReason;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReentryState {
    pub last_exit_price: Option<f64>,
    pub last_exit_reason: Option<ExitReason>,
    /// Session date of the last time-based exit.
    pub last_exit_date: Option<NaiveDate>,
    pub last_entry_price: Option<f64>,
}

impl ReentryState {
    /// True until the first position has been opened and closed.
    pub fn never_traded(&self) -> bool {
        self.last_entry_price.is_none()
    }

    /// Same-day block after a time-based exit.
    pub fn blocks_date(&self, session_date: NaiveDate) -> bool {
        self.last_exit_reason.is_some_and(ExitReason::is_time_based)
            && self.last_exit_date == Some(session_date)
    }

    pub fn record_exit(
        &mut self,
        entry_price: f64,
        exit_price: f64,
        reason: ExitReason,
        session_date: NaiveDate,
    ) {
        self.last_entry_price = Some(entry_price);
        self.last_exit_price = Some(exit_price);
        self.last_exit_reason = Some(reason);
        if reason.is_time_based() {
            self.last_exit_date = Some(session_date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_never_traded() {
        let state = ReentryState::default();
        assert!(state.never_traded());
        assert!(!state.blocks_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }

    #[test]
    fn time_based_exit_blocks_only_that_date() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut state = ReentryState::default();
        state.record_exit(100.0, 104.0, ExitReason::SessionEnd, d);
        assert!(state.blocks_date(d));
        assert!(!state.blocks_date(d.succ_opt().unwrap()));
    }

    #[test]
    fn price_exit_keeps_previous_date_but_does_not_block() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut state = ReentryState::default();
        state.record_exit(100.0, 104.0, ExitReason::SessionEnd, d);
        state.record_exit(105.0, 95.0, ExitReason::BaseStop, d);
        assert!(!state.blocks_date(d));
        assert_eq!(state.last_entry_price, Some(105.0));
        assert_eq!(state.last_exit_price, Some(95.0));
    }
}
