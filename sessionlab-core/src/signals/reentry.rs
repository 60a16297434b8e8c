//! Re-entry eligibility after a closed trade.

use crate::config::ReentryConfig;
use crate::domain::{Bar, ReentryState};
use crate::indicators::IndicatorSnapshot;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub enum ReentryDecision {
    /// No position has been opened yet.
    FirstEntry,
    /// A previous trade exists and every re-entry rule holds.
    Allowed,
    Blocked(String),
}

impl ReentryDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, ReentryDecision::Blocked(_))
    }
}

/// Apply the re-entry rules to the current observation.
///
/// `trend_enabled` decides whether the trend condition takes part; a
/// disabled trend filter never blocks.
pub fn check_reentry(
    config: &ReentryConfig,
    trend_enabled: bool,
    snapshot: &IndicatorSnapshot,
    bar: &Bar,
    state: &ReentryState,
    session_date: NaiveDate,
) -> ReentryDecision {
    let Some(last_entry) = state.last_entry_price else {
        return ReentryDecision::FirstEntry;
    };

    if state.blocks_date(session_date) {
        return ReentryDecision::Blocked(format!(
            "re-entry blocked: time-based exit earlier on {session_date}"
        ));
    }

    let floor = last_entry + config.price_buffer;
    if !(bar.close > floor) {
        return ReentryDecision::Blocked(format!(
            "re-entry blocked: close {:.2} not above last entry {last_entry:.2} + {}",
            bar.close, config.price_buffer
        ));
    }

    if trend_enabled && !snapshot.trend_up {
        return ReentryDecision::Blocked("re-entry blocked: trend not up".into());
    }

    if snapshot.recent_len < config.lookback {
        return ReentryDecision::Blocked(format!(
            "re-entry blocked: {} of {} momentum bars seen",
            snapshot.recent_len, config.lookback
        ));
    }
    if snapshot.recent_green < config.min_green_bars {
        return ReentryDecision::Blocked(format!(
            "re-entry blocked: {} green of last {} (need {})",
            snapshot.recent_green, config.lookback, config.min_green_bars
        ));
    }
    if !(snapshot.recent_net_change > 0.0) {
        return ReentryDecision::Blocked(format!(
            "re-entry blocked: net change {:.2} over last {} bars",
            snapshot.recent_net_change, config.lookback
        ));
    }

    ReentryDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::domain::ExitReason;
    use crate::indicators::make_bars;

    fn snapshot(bar: &Bar) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: bar.timestamp,
            close: Some(bar.close),
            ema_fast: None,
            ema_slow: None,
            rsi: None,
            vwap: None,
            atr: None,
            trend_ema: Some(100.0),
            trend_up: true,
            consecutive_up: 0,
            recent_green: 4,
            recent_len: 5,
            recent_net_change: 3.0,
            warm: true,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn first_entry_always_allowed() {
        let config = sample_config().strategy.reentry;
        let bar = make_bars(&[50.0])[0].clone();
        let decision = check_reentry(&config, true, &snapshot(&bar), &bar, &ReentryState::default(), day());
        assert_eq!(decision, ReentryDecision::FirstEntry);
    }

    #[test]
    fn same_day_after_session_end_blocked() {
        let config = sample_config().strategy.reentry;
        let bar = make_bars(&[120.0])[0].clone();
        let mut state = ReentryState::default();
        state.record_exit(100.0, 110.0, ExitReason::SessionEnd, day());
        let decision = check_reentry(&config, true, &snapshot(&bar), &bar, &state, day());
        assert!(!decision.is_allowed());

        let next = day().succ_opt().unwrap();
        let decision = check_reentry(&config, true, &snapshot(&bar), &bar, &state, next);
        assert_eq!(decision, ReentryDecision::Allowed);
    }

    #[test]
    fn price_must_clear_last_entry_plus_buffer() {
        let config = sample_config().strategy.reentry;
        let mut state = ReentryState::default();
        state.record_exit(100.0, 95.0, ExitReason::BaseStop, day());

        // buffer is 2.0: 102 is not strictly above 102
        let bar = make_bars(&[102.0])[0].clone();
        assert!(!check_reentry(&config, true, &snapshot(&bar), &bar, &state, day()).is_allowed());
        let bar = make_bars(&[102.5])[0].clone();
        assert!(check_reentry(&config, true, &snapshot(&bar), &bar, &state, day()).is_allowed());
    }

    #[test]
    fn trend_and_momentum_window_required() {
        let config = sample_config().strategy.reentry;
        let mut state = ReentryState::default();
        state.record_exit(100.0, 95.0, ExitReason::BaseStop, day());
        let bar = make_bars(&[110.0])[0].clone();

        let mut snap = snapshot(&bar);
        snap.trend_up = false;
        assert!(!check_reentry(&config, true, &snap, &bar, &state, day()).is_allowed());
        // disabled trend filter does not participate
        assert!(check_reentry(&config, false, &snap, &bar, &state, day()).is_allowed());

        let mut snap = snapshot(&bar);
        snap.recent_len = 4;
        assert!(!check_reentry(&config, true, &snap, &bar, &state, day()).is_allowed());

        let mut snap = snapshot(&bar);
        snap.recent_green = 2;
        assert!(!check_reentry(&config, true, &snap, &bar, &state, day()).is_allowed());

        let mut snap = snapshot(&bar);
        snap.recent_net_change = 0.0;
        assert!(!check_reentry(&config, true, &snap, &bar, &state, day()).is_allowed());
    }
}
