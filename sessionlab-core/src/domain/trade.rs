//! TradeRecord: a completed round-trip trade, plus exit reason tags.

use super::ids::TradeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position (or the last slice of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "base stop")]
    BaseStop,
    #[serde(rename = "trailing stop")]
    TrailingStop,
    /// Final take-profit tier filled.
    #[serde(rename = "profit")]
    Profit,
    /// Forced flatten near session end (time-based).
    #[serde(rename = "session end")]
    SessionEnd,
    /// Input exhausted with the position still open.
    #[serde(rename = "end of data")]
    EndOfData,
}

impl ExitReason {
    /// Time-based exits block same-day re-entry.
    pub fn is_time_based(self) -> bool {
        matches!(self, ExitReason::SessionEnd)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::BaseStop => "base stop",
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::Profit => "profit",
            ExitReason::SessionEnd => "session end",
            ExitReason::EndOfData => "end of data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slice of a position closed at a single price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    pub pnl: f64,
    /// 1-based take-profit tier, `None` for stop/forced exits.
    pub tier: Option<usize>,
}

/// A complete round-trip trade: entry → (partial exits) → final exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,

    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: f64,

    // ── PnL ──
    /// Sum of every fill's P&L, partial exits included.
    pub realized_pnl: f64,

    pub fills: Vec<ExitFill>,
}

impl TradeRecord {
    /// Return on the trade as a fraction of entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.quantity == 0.0 {
            return 0.0;
        }
        self.realized_pnl / (self.entry_price * self.quantity)
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// Quantity-weighted average exit price across all fills.
    pub fn avg_exit_price(&self) -> f64 {
        let qty: f64 = self.fills.iter().map(|f| f.quantity).sum();
        if qty == 0.0 {
            return self.exit_price;
        }
        self.fills.iter().map(|f| f.price * f.quantity).sum::<f64>() / qty
    }
}
