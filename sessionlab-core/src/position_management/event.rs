/// Lifecycle events emitted by the position manager
///
/// Every state change of the FLAT → PENDING → OPEN → FLAT machine is
/// reported as one event. Drivers forward closed trades to a sink; tests
/// compare whole event sequences across drivers.
use crate::domain::TradeRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Signal fired with a non-zero entry buffer; waiting for the trigger.
    PendingCreated {
        timestamp: DateTime<Utc>,
        signal_price: f64,
        trigger_price: f64,
    },

    /// Pending entry dropped without filling.
    PendingDiscarded {
        timestamp: DateTime<Utc>,
        trigger_price: f64,
        reason: String,
    },

    EntryAccepted {
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: f64,
        base_stop: f64,
        reason: String,
    },

    TrailingActivated {
        timestamp: DateTime<Utc>,
        level: f64,
    },

    /// A take-profit tier closed part of the position.
    PartialExit {
        timestamp: DateTime<Utc>,
        /// 1-based tier number.
        tier: usize,
        price: f64,
        quantity: f64,
        pnl: f64,
    },

    /// Remaining quantity closed; the trade is complete.
    FullExit { trade: TradeRecord },
}

impl LifecycleEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::PendingCreated { timestamp, .. }
            | LifecycleEvent::PendingDiscarded { timestamp, .. }
            | LifecycleEvent::EntryAccepted { timestamp, .. }
            | LifecycleEvent::TrailingActivated { timestamp, .. }
            | LifecycleEvent::PartialExit { timestamp, .. } => *timestamp,
            LifecycleEvent::FullExit { trade } => trade.exit_time,
        }
    }

    pub fn closed_trade(&self) -> Option<&TradeRecord> {
        match self {
            LifecycleEvent::FullExit { trade } => Some(trade),
            _ => None,
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, LifecycleEvent::EntryAccepted { .. })
    }
}
