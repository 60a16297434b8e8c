//! Indicator bank: one incremental tracker per enabled indicator family.
//!
//! `advance` is the only mutator. It is called exactly once per observation,
//! in time order, by whichever driver owns the engine.

use super::{Atr, ConsecutiveUp, Ema, Indicator, RecentWindow, Rsi, Vwap};
use crate::config::StrategyConfig;
use crate::domain::Bar;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

/// Indicator values after the latest observation.
///
/// `None` means disabled or not yet available. No field ever holds NaN, so
/// two snapshots compare equal exactly when every value matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Last valid close.
    pub close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub vwap: Option<f64>,
    pub atr: Option<f64>,
    pub trend_ema: Option<f64>,
    /// Close above the trend EMA. False while the trend EMA is unavailable.
    pub trend_up: bool,
    pub consecutive_up: usize,
    pub recent_green: usize,
    pub recent_len: usize,
    pub recent_net_change: f64,
    /// Every enabled tracker has finished warm-up.
    pub warm: bool,
}

#[derive(Debug, Clone)]
pub struct IndicatorBank {
    ema_fast: Option<Ema>,
    ema_slow: Option<Ema>,
    rsi: Option<Rsi>,
    vwap: Option<Vwap>,
    atr: Option<Atr>,
    trend: Option<Ema>,
    consecutive_up: ConsecutiveUp,
    recent: RecentWindow,
    session_date: Option<NaiveDate>,
    last_close: Option<f64>,
    observations: usize,
}

impl IndicatorBank {
    pub fn new(config: &StrategyConfig) -> Self {
        let ema = &config.ema;
        Self {
            ema_fast: ema.enabled.then(|| Ema::new(ema.fast_period)),
            ema_slow: ema.enabled.then(|| Ema::new(ema.slow_period)),
            rsi: config.rsi.enabled.then(|| Rsi::new(config.rsi.period)),
            vwap: config.vwap.enabled.then(Vwap::new),
            atr: config.atr.enabled.then(|| Atr::new(config.atr.period)),
            trend: config.trend.enabled.then(|| Ema::new(config.trend.period)),
            consecutive_up: ConsecutiveUp::new(),
            recent: RecentWindow::new(config.reentry.lookback),
            session_date: None,
            last_close: None,
            observations: 0,
        }
    }

    /// Fold one observation into every tracker and return the new snapshot.
    ///
    /// A change of `session_date` resets the session VWAP before the
    /// observation is folded in.
    pub fn advance(&mut self, bar: &Bar, session_date: NaiveDate) -> IndicatorSnapshot {
        if self.session_date != Some(session_date) {
            if let Some(vwap) = self.vwap.as_mut() {
                vwap.reset();
            }
            self.session_date = Some(session_date);
        }

        if bar.is_void() {
            warn!(
                timestamp = %bar.timestamp,
                "observation has a NaN price field; trackers hold their previous values"
            );
        }

        for tracker in self.trackers_mut() {
            tracker.update(bar);
        }
        self.consecutive_up.update(bar);
        self.recent.update(bar);
        if !bar.close.is_nan() {
            self.last_close = Some(bar.close);
        }
        self.observations += 1;

        self.snapshot(bar.timestamp)
    }

    fn trackers_mut(&mut self) -> impl Iterator<Item = &mut dyn Indicator> {
        let emas = [
            self.ema_fast.as_mut(),
            self.ema_slow.as_mut(),
            self.trend.as_mut(),
        ]
        .into_iter()
        .flatten()
        .map(|e| e as &mut dyn Indicator);
        emas.chain(self.rsi.as_mut().map(|t| t as &mut dyn Indicator))
            .chain(self.vwap.as_mut().map(|t| t as &mut dyn Indicator))
            .chain(self.atr.as_mut().map(|t| t as &mut dyn Indicator))
    }

    fn trackers(&self) -> impl Iterator<Item = &dyn Indicator> {
        let emas = [self.ema_fast.as_ref(), self.ema_slow.as_ref(), self.trend.as_ref()]
            .into_iter()
            .flatten()
            .map(|e| e as &dyn Indicator);
        emas.chain(self.rsi.as_ref().map(|t| t as &dyn Indicator))
            .chain(self.vwap.as_ref().map(|t| t as &dyn Indicator))
            .chain(self.atr.as_ref().map(|t| t as &dyn Indicator))
    }

    fn snapshot(&self, timestamp: DateTime<Utc>) -> IndicatorSnapshot {
        let trend_ema = self.trend.as_ref().and_then(|t| t.value());
        let trend_up = matches!(
            (self.last_close, trend_ema),
            (Some(close), Some(trend)) if close > trend
        );

        IndicatorSnapshot {
            timestamp,
            close: self.last_close,
            ema_fast: self.ema_fast.as_ref().and_then(|t| t.value()),
            ema_slow: self.ema_slow.as_ref().and_then(|t| t.value()),
            rsi: self.rsi.as_ref().and_then(|t| t.value()),
            vwap: self.vwap.as_ref().and_then(|t| t.value()),
            atr: self.atr.as_ref().and_then(|t| t.value()),
            trend_ema,
            trend_up,
            consecutive_up: self.consecutive_up.count(),
            recent_green: self.recent.green_count(),
            recent_len: self.recent.len(),
            recent_net_change: self.recent.net_change(),
            warm: self.is_warm(),
        }
    }

    pub fn is_warm(&self) -> bool {
        self.trackers().all(|t| t.is_warm())
    }

    /// Maximum lookback across enabled trackers.
    pub fn warmup_len(&self) -> usize {
        self.trackers().map(|t| t.lookback()).max().unwrap_or(0)
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Names of the enabled trackers, for logging.
    pub fn tracker_names(&self) -> Vec<String> {
        self.trackers().map(|t| t.name().to_string()).collect()
    }

    pub fn recent_window(&self) -> &RecentWindow {
        &self.recent
    }
}
