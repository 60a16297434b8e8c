//! Relative Strength Index (RSI).
//!
//! Seed: simple average of the first `period` close-to-close gains and losses.
//! Then Wilder smoothing: avg = (avg * (period - 1) + x) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Edge cases: avg_loss == 0 → RSI = 100. Before warm-up the neutral 50 is reported.

use super::Indicator;
use crate::domain::Bar;

/// Value reported until the seed window completes.
pub const RSI_NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    // Warm-up accumulators; only sums are carried, never the raw changes.
    seed_gain: f64,
    seed_loss: f64,
    seed_count: usize,
    avg_gain: f64,
    avg_loss: f64,
    warm: bool,
    value: f64,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            seed_count: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            warm: false,
            value: RSI_NEUTRAL,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    /// Needs `period` changes, i.e. `period + 1` observations.
    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let close = bar.close;
        if close.is_nan() {
            return Some(self.value);
        }
        let Some(prev) = self.prev_close.replace(close) else {
            return Some(self.value);
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let p = self.period as f64;

        if self.warm {
            self.avg_gain = (self.avg_gain * (p - 1.0) + gain) / p;
            self.avg_loss = (self.avg_loss * (p - 1.0) + loss) / p;
            self.value = compute_rsi(self.avg_gain, self.avg_loss);
        } else {
            self.seed_gain += gain;
            self.seed_loss += loss;
            self.seed_count += 1;
            if self.seed_count == self.period {
                self.avg_gain = self.seed_gain / p;
                self.avg_loss = self.seed_loss / p;
                self.warm = true;
                self.value = compute_rsi(self.avg_gain, self.avg_loss);
            }
        }
        Some(self.value)
    }

    fn value(&self) -> Option<f64> {
        Some(self.value)
    }

    fn is_warm(&self) -> bool {
        self.warm
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, run_indicator};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let mut rsi = Rsi::new(3);
        let result = run_indicator(&mut rsi, &bars);
        // All positive changes → RSI = 100
        assert_approx(result[3].unwrap(), 100.0, 1e-6);
        assert_approx(result[5].unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let mut rsi = Rsi::new(3);
        let result = run_indicator(&mut rsi, &bars);
        // All negative changes → RSI = 0
        assert_approx(result[3].unwrap(), 0.0, 1e-6);
    }

    #[test]
    fn rsi_flat_reads_maximum() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let mut rsi = Rsi::new(3);
        let result = run_indicator(&mut rsi, &bars);
        assert_approx(result[3].unwrap(), 100.0, 1e-9);
    }

    #[test]
    fn rsi_mixed_seed_and_wilder_step() {
        // Closes: 44, 44.34, 44.09, 43.61, 44.33
        // Changes: +0.34, -0.25, -0.48, +0.72
        // period=3 seed: avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI[3] = 100 - 100/(1 + 0.34/0.73)
        // Wilder: avg_gain = (0.34/3*2 + 0.72)/3, avg_loss = (0.73/3*2)/3
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let mut rsi = Rsi::new(3);
        let result = run_indicator(&mut rsi, &bars);

        assert_eq!(result[0], Some(RSI_NEUTRAL));
        assert_eq!(result[2], Some(RSI_NEUTRAL));
        let expected3 = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3].unwrap(), expected3, 1e-9);

        let g = (0.34 / 3.0 * 2.0 + 0.72) / 3.0;
        let l = (0.73 / 3.0 * 2.0) / 3.0;
        assert_approx(result[4].unwrap(), 100.0 - 100.0 / (1.0 + g / l), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        // RSI should always be between 0 and 100
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let mut rsi = Rsi::new(3);
        for (i, v) in run_indicator(&mut rsi, &bars).into_iter().enumerate() {
            let v = v.unwrap();
            assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
        }
    }

    #[test]
    fn rsi_nan_is_skipped() {
        let clean = make_bars(&[100.0, 101.0, 102.0, 103.0]);
        let mut dirty = clean.clone();
        dirty.insert(2, {
            let mut b = clean[1].clone();
            b.close = f64::NAN;
            b
        });
        let mut a = Rsi::new(3);
        let mut b = Rsi::new(3);
        let ra = run_indicator(&mut a, &clean);
        let rb = run_indicator(&mut b, &dirty);
        assert_eq!(rb[2], rb[1]);
        assert_eq!(ra.last(), rb.last());
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 15);
    }
}
