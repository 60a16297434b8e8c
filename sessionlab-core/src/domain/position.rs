//! Position: the single open long position and its stop/tier state.

use super::trade::ExitFill;
use crate::position_management::RatchetState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remaining quantity below this is treated as flat.
pub const QTY_EPSILON: f64 = 1e-9;

/// Open long position.
///
/// Created on an accepted entry, mutated on every observation while open,
/// and converted into a `TradeRecord` when the remaining quantity reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Original quantity at entry. Tier sizes are fractions of this.
    pub quantity: f64,
    pub remaining: f64,
    /// Filled flag per take-profit tier, in configured order.
    pub tiers_filled: Vec<bool>,
    /// Fixed stop, set once at entry.
    pub base_stop: f64,
    /// Trailing stop; `current_level()` is `None` until activation.
    pub trailing: RatchetState,
    /// Highest close since entry.
    pub high_water_mark: f64,
    /// P&L booked by partial exits so far.
    pub realized_pnl: f64,
    pub fills: Vec<ExitFill>,
}

impl Position {
    pub fn open(
        entry_time: DateTime<Utc>,
        entry_price: f64,
        quantity: f64,
        base_stop: f64,
        tier_count: usize,
    ) -> Self {
        Self {
            entry_time,
            entry_price,
            quantity,
            remaining: quantity,
            tiers_filled: vec![false; tier_count],
            base_stop,
            trailing: RatchetState::long(),
            high_water_mark: entry_price,
            realized_pnl: 0.0,
            fills: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.remaining <= QTY_EPSILON
    }

    pub fn trailing_stop(&self) -> Option<f64> {
        self.trailing.current_level()
    }

    /// max(base stop, trailing stop if active).
    pub fn effective_stop(&self) -> f64 {
        match self.trailing_stop() {
            Some(trail) => self.base_stop.max(trail),
            None => self.base_stop,
        }
    }

    /// Per-unit open profit at `price`.
    pub fn profit_per_unit(&self, price: f64) -> f64 {
        price - self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.remaining * (price - self.entry_price)
    }

    pub fn filled_quantity(&self) -> f64 {
        self.quantity - self.remaining
    }

    /// Tier `index` (0-based) may fill only once every earlier tier has.
    pub fn tier_unlocked(&self, index: usize) -> bool {
        index == 0 || self.tiers_filled.get(index - 1).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_position() -> Position {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        Position::open(ts, 100.0, 10.0, 90.0, 2)
    }

    #[test]
    fn new_position_state() {
        let pos = sample_position();
        assert_eq!(pos.remaining, 10.0);
        assert_eq!(pos.high_water_mark, 100.0);
        assert_eq!(pos.trailing_stop(), None);
        assert_eq!(pos.effective_stop(), 90.0);
        assert!(!pos.is_flat());
        assert_eq!(pos.tiers_filled, vec![false, false]);
    }

    #[test]
    fn effective_stop_takes_tighter_level() {
        let mut pos = sample_position();
        pos.trailing.apply(95.0);
        assert_eq!(pos.effective_stop(), 95.0);

        let mut loose = sample_position();
        loose.trailing.apply(85.0);
        assert_eq!(loose.effective_stop(), 90.0);
    }

    #[test]
    fn tier_prerequisites() {
        let mut pos = sample_position();
        assert!(pos.tier_unlocked(0));
        assert!(!pos.tier_unlocked(1));
        pos.tiers_filled[0] = true;
        assert!(pos.tier_unlocked(1));
    }

    #[test]
    fn pnl_helpers() {
        let mut pos = sample_position();
        pos.remaining = 4.0;
        assert_eq!(pos.unrealized_pnl(105.0), 20.0);
        assert_eq!(pos.filled_quantity(), 6.0);
        assert_eq!(pos.profit_per_unit(97.0), -3.0);
    }
}
