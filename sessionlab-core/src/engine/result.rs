//! Run result and summary statistics.

use crate::domain::{ConfigHash, Position, TradeRecord};
use crate::position_management::LifecycleEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What kind of data fault a warning describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Timestamp earlier than the previous observation; rejected.
    OutOfOrder,
    /// NaN in an OHLC field; trackers held, no decisions taken.
    VoidObservation,
    /// Inconsistent OHLC values (e.g. high below low); processed as given.
    InsaneObservation,
}

/// A data-quality fault recovered during the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataWarning {
    pub timestamp: DateTime<Utc>,
    pub kind: WarningKind,
    pub message: String,
}

impl DataWarning {
    pub fn new(timestamp: DateTime<Utc>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            message: message.into(),
        }
    }
}

/// Complete result of a replay or stream run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Fingerprint of the configuration that produced this run.
    pub config_hash: ConfigHash,
    /// Observations accepted (out-of-order ones excluded).
    pub observations: usize,
    pub trades: Vec<TradeRecord>,
    /// Every lifecycle event, in emission order.
    pub events: Vec<LifecycleEvent>,
    pub stats: RunStats,
    pub warnings: Vec<DataWarning>,
    /// Still open when the run ended (stream stopped before end of data).
    pub open_position: Option<Position>,
    /// The stream was stopped by its `StopHandle` rather than running dry.
    pub stopped: bool,
}

/// Performance statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub initial_equity: f64,
    pub final_equity: f64,
    /// Sum of realized P&L over closed trades and partial fills.
    pub total_pnl: f64,
    /// Total return (fractional, e.g., 0.25 = 25%)
    pub total_return: f64,
    pub num_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Win rate (fraction of profitable trades)
    pub win_rate: f64,
    /// Maximum drawdown of the realized equity curve (fractional, <= 0)
    pub max_drawdown: f64,
}

impl RunStats {
    /// `equity_curve` is the realized equity after every fill, starting with
    /// the initial equity.
    pub fn from_results(
        initial_equity: f64,
        final_equity: f64,
        trades: &[TradeRecord],
        equity_curve: &[f64],
    ) -> Self {
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let total_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            0.0
        };
        Self {
            initial_equity,
            final_equity,
            total_pnl: final_equity - initial_equity,
            total_return,
            num_trades: trades.len(),
            wins,
            losses: trades.len() - wins,
            win_rate: win_rate(trades),
            max_drawdown: max_drawdown(equity_curve),
        }
    }
}

/// Max drawdown as a fraction (negative).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}
