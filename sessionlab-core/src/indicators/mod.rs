//! Incremental indicator trackers and the bank that owns them.
//!
//! Every tracker folds one observation at a time into a small carried state.
//! Nothing is recomputed from raw history, so the value after observation `t`
//! depends only on observations `0..=t` and never on how they were batched.
//!
//! A NaN in a field a tracker reads leaves that tracker unchanged: it keeps
//! reporting its previous valid value (or its neutral pre-warm-up value).

pub mod atr;
pub mod bank;
pub mod ema;
pub mod momentum;
pub mod rsi;
pub mod vwap;

pub use atr::Atr;
pub use bank::{IndicatorBank, IndicatorSnapshot};
pub use ema::Ema;
pub use momentum::{ConsecutiveUp, RecentWindow};
pub use rsi::Rsi;
pub use vwap::Vwap;

use crate::domain::Bar;

/// Trait for incremental indicators.
///
/// # Look-ahead contamination guard
/// `update` sees exactly one new observation. A tracker has no access to any
/// later observation, and no access to earlier ones beyond what it carries.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_9", "atr_14").
    fn name(&self) -> &str;

    /// Number of observations needed before `is_warm()` turns true.
    fn lookback(&self) -> usize;

    /// Fold one observation into the state. Returns the current value.
    fn update(&mut self, bar: &Bar) -> Option<f64>;

    /// Current value, `None` before the first valid value exists.
    fn value(&self) -> Option<f64>;

    fn is_warm(&self) -> bool;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars are one minute apart starting 2024-01-02 10:00 UTC.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Run a tracker over `bars`, collecting the value after each update.
#[cfg(test)]
pub fn run_indicator(indicator: &mut dyn Indicator, bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter().map(|b| indicator.update(b)).collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
