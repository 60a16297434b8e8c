//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! The first observation only provides a previous close. The next `period`
//! true ranges are simple-averaged to seed; afterwards Wilder smoothing:
//! ATR = (ATR * (period - 1) + TR) / period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    /// Holds at most `period` true ranges, emptied once seeded.
    seed: Vec<f64>,
    value: Option<f64>,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            prev_close: None,
            seed: Vec::with_capacity(period),
            value: None,
            name: format!("atr_{period}"),
        }
    }
}

/// True range of `bar` against the previous close.
pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    let (h, l) = (bar.high, bar.low);
    (h - l).max((h - prev_close).abs()).max((l - prev_close).abs())
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        if bar.high.is_nan() || bar.low.is_nan() || bar.close.is_nan() {
            return self.value;
        }
        let Some(prev) = self.prev_close.replace(bar.close) else {
            return self.value;
        };
        let tr = true_range(bar, prev);

        match self.value {
            Some(atr) => {
                let p = self.period as f64;
                self.value = Some((atr * (p - 1.0) + tr) / p);
            }
            None => {
                self.seed.push(tr);
                if self.seed.len() == self.period {
                    let mean = self.seed.iter().sum::<f64>() / self.period as f64;
                    self.value = Some(mean);
                    self.seed = Vec::new();
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, run_indicator, DEFAULT_EPSILON};
    use chrono::TimeZone;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
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

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 110-115-108
        let bars = make_ohlc_bars(&[(110.0, 115.0, 108.0, 112.0)]);
        assert_approx(true_range(&bars[0], 100.0), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // no TR (no prev close)
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let mut atr = Atr::new(3);
        let result = run_indicator(&mut atr, &bars);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert!(result[2].is_none());
        // Seed: ATR[3] = mean(8, 9, 6) = 23/3
        // ATR[4] = (23/3 * 2 + 6) / 3 = 64/9
        assert_approx(result[3].unwrap(), 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4].unwrap(), 64.0 / 9.0, DEFAULT_EPSILON);
        assert!(atr.is_warm());
    }

    #[test]
    fn atr_nan_holds_value() {
        let mut bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
        ]);
        bars[3].high = f64::NAN;
        let mut atr = Atr::new(2);
        let result = run_indicator(&mut atr, &bars);
        // seed from TR 8, 9
        assert_approx(result[2].unwrap(), 8.5, DEFAULT_EPSILON);
        assert_eq!(result[3], result[2]);
    }

    #[test]
    fn tick_series_measures_close_to_close_moves() {
        let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let ticks: Vec<Bar> = [100.0, 101.0, 99.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::from_tick(base + chrono::Duration::seconds(i as i64), p, 1.0))
            .collect();
        let mut atr = Atr::new(2);
        let result = run_indicator(&mut atr, &ticks);
        assert_approx(result[2].unwrap(), 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 15);
    }
}
