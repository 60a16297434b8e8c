//! Risk sizer: risk a fixed percentage of equity against the fixed stop.

/// Fixed-risk position sizer
///
/// # Formula
/// ```text
/// risk_dollars = equity * risk_pct / 100
/// quantity     = max(1, floor(risk_dollars / stop_distance))
/// ```
///
/// # Example
/// - Equity: $100,000
/// - Risk per trade: 1% ($1,000)
/// - Fixed stop distance: $10
/// - Quantity: $1,000 / $10 = 100 units
#[derive(Debug, Clone)]
pub struct RiskSizer {
    /// Percent of equity risked per trade (1.0 = 1%).
    risk_pct: f64,
    stop_distance: f64,
}

/// Smallest tradable quantity.
pub const MIN_QUANTITY: f64 = 1.0;

impl RiskSizer {
    /// Both inputs are validated by `StrategyConfig::validate`.
    pub fn new(risk_pct: f64, stop_distance: f64) -> Self {
        Self {
            risk_pct,
            stop_distance,
        }
    }

    pub fn size(&self, equity: f64) -> f64 {
        let risk_dollars = equity * self.risk_pct / 100.0;
        let raw = (risk_dollars / self.stop_distance).floor();
        if raw.is_finite() {
            raw.max(MIN_QUANTITY)
        } else {
            MIN_QUANTITY
        }
    }

    pub fn risk_pct(&self) -> f64 {
        self.risk_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sizing() {
        let sizer = RiskSizer::new(1.0, 10.0);
        assert_eq!(sizer.size(100_000.0), 100.0);
    }

    #[test]
    fn test_fractional_result_is_floored() {
        let sizer = RiskSizer::new(1.0, 3.0);
        // 1000 / 3 = 333.33
        assert_eq!(sizer.size(100_000.0), 333.0);
    }

    #[test]
    fn test_minimum_quantity() {
        let sizer = RiskSizer::new(0.5, 50.0);
        // 5 / 50 = 0.1 → floor 0 → minimum 1
        assert_eq!(sizer.size(1_000.0), 1.0);
        assert_eq!(sizer.size(-500.0), 1.0);
    }
}
