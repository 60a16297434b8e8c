//! Session Volume-Weighted Average Price (VWAP).
//!
//! VWAP = Σ(typical_price × volume) / Σvolume since the last session boundary.
//! While cumulative volume is zero the last valid ratio is reported, including
//! across a reset.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cum_pv: f64,
    cum_volume: f64,
    value: Option<f64>,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session: clear the accumulators, keep the last value.
    pub fn reset(&mut self) {
        self.cum_pv = 0.0;
        self.cum_volume = 0.0;
    }

    pub fn cumulative_volume(&self) -> f64 {
        self.cum_volume
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tp = bar.typical_price();
        let volume = bar.volume;
        if tp.is_nan() || volume.is_nan() || volume < 0.0 {
            return self.value;
        }
        self.cum_pv += tp * volume;
        self.cum_volume += volume;
        if self.cum_volume > 0.0 {
            self.value = Some(self.cum_pv / self.cum_volume);
        }
        self.value
    }

    fn value(&self) -> Option<f64> {
        self.value
    }

    fn is_warm(&self) -> bool {
        self.value.is_some()
    }
}
