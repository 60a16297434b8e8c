//! Position lifecycle: FLAT → PENDING (optional) → OPEN → FLAT.
//!
//! The lifecycle owns the single position, the pending entry, account
//! equity, the closed-trade history and the re-entry memory. Nothing outside
//! this type writes any of them.
//!
//! While OPEN, each observation runs a fixed sequence:
//! 1. forced exit (flatten window) closes everything, `session end`
//! 2. high-water mark and trailing stop update (ratchet, never lowers)
//! 3. stop check against max(base, trailing)
//! 4. take-profit tiers in ascending order, several per observation allowed
//!
//! A full exit ends the observation; no entry is taken on the same bar.

use super::{LifecycleEvent, RiskSizer};
use crate::config::{StopConfig, StrategyConfig, TakeProfitTier};
use crate::domain::{
    Bar, ExitFill, ExitReason, IdGen, Position, ReentryState, TradeRecord, QTY_EPSILON,
};
use crate::indicators::IndicatorSnapshot;
use crate::signals::EntrySignal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Entry signal waiting for price to reach `trigger_price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEntry {
    pub signal_time: DateTime<Utc>,
    pub signal_price: f64,
    pub trigger_price: f64,
    /// Indicator values when the signal fired.
    pub snapshot: IndicatorSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Flat,
    Pending(PendingEntry),
    Open(Position),
}

#[derive(Debug, Clone)]
pub struct PositionLifecycle {
    stops: StopConfig,
    tiers: Vec<TakeProfitTier>,
    entry_buffer: f64,
    sizer: RiskSizer,
    initial_equity: f64,
    equity: f64,
    state: LifecycleState,
    trades: Vec<TradeRecord>,
    reentry: ReentryState,
    ids: IdGen,
}

impl PositionLifecycle {
    pub fn new(config: &StrategyConfig, initial_equity: f64) -> Self {
        Self {
            stops: config.stops.clone(),
            tiers: config.take_profit.clone(),
            entry_buffer: config.entry.entry_buffer,
            sizer: RiskSizer::new(
                config.entry.risk_per_trade_pct,
                config.stops.fixed_stop_distance,
            ),
            initial_equity,
            equity: initial_equity,
            state: LifecycleState::Flat,
            trades: Vec::new(),
            reentry: ReentryState::default(),
            ids: IdGen::default(),
        }
    }

    /// Run one observation through the state machine.
    ///
    /// `signal` is the entry evaluation of this same observation; it is used
    /// for new entries and to re-validate a pending one.
    pub fn apply(
        &mut self,
        bar: &Bar,
        signal: &EntrySignal,
        snapshot: &IndicatorSnapshot,
        force_exit: bool,
        session_date: NaiveDate,
    ) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        self.state = match std::mem::replace(&mut self.state, LifecycleState::Flat) {
            LifecycleState::Open(position) => {
                self.manage_open(position, bar, force_exit, session_date, &mut events)
            }
            LifecycleState::Pending(pending) => {
                self.resolve_pending(pending, bar, signal, &mut events)
            }
            LifecycleState::Flat if signal.fire => {
                self.on_signal(bar, signal, snapshot, &mut events)
            }
            LifecycleState::Flat => LifecycleState::Flat,
        };
        events
    }

    fn on_signal(
        &mut self,
        bar: &Bar,
        signal: &EntrySignal,
        snapshot: &IndicatorSnapshot,
        events: &mut Vec<LifecycleEvent>,
    ) -> LifecycleState {
        if self.entry_buffer > 0.0 {
            debug!(
                timestamp = %bar.timestamp,
                signal_price = bar.close,
                trigger_price = signal.trigger_price,
                "pending entry created"
            );
            events.push(LifecycleEvent::PendingCreated {
                timestamp: bar.timestamp,
                signal_price: bar.close,
                trigger_price: signal.trigger_price,
            });
            return LifecycleState::Pending(PendingEntry {
                signal_time: bar.timestamp,
                signal_price: bar.close,
                trigger_price: signal.trigger_price,
                snapshot: snapshot.clone(),
            });
        }
        self.open_position(bar.timestamp, bar.close, &signal.reason, events)
    }

    /// Pending entries are re-validated against the current observation's
    /// signal, never the one they were created from.
    fn resolve_pending(
        &mut self,
        pending: PendingEntry,
        bar: &Bar,
        signal: &EntrySignal,
        events: &mut Vec<LifecycleEvent>,
    ) -> LifecycleState {
        if !signal.fire {
            debug!(
                timestamp = %bar.timestamp,
                trigger_price = pending.trigger_price,
                reason = %signal.reason,
                "pending entry discarded"
            );
            events.push(LifecycleEvent::PendingDiscarded {
                timestamp: bar.timestamp,
                trigger_price: pending.trigger_price,
                reason: signal.reason.clone(),
            });
            return LifecycleState::Flat;
        }
        if bar.high >= pending.trigger_price {
            let price = bar.high.min(pending.trigger_price);
            return self.open_position(bar.timestamp, price, &signal.reason, events);
        }
        LifecycleState::Pending(pending)
    }

    fn open_position(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: &str,
        events: &mut Vec<LifecycleEvent>,
    ) -> LifecycleState {
        let quantity = self.sizer.size(self.equity);
        let base_stop = price - self.stops.fixed_stop_distance;
        info!(
            timestamp = %timestamp,
            price,
            quantity,
            base_stop,
            reason,
            "entry accepted"
        );
        events.push(LifecycleEvent::EntryAccepted {
            timestamp,
            price,
            quantity,
            base_stop,
            reason: reason.to_string(),
        });
        LifecycleState::Open(Position::open(
            timestamp,
            price,
            quantity,
            base_stop,
            self.tiers.len(),
        ))
    }

    fn manage_open(
        &mut self,
        mut pos: Position,
        bar: &Bar,
        force_exit: bool,
        session_date: NaiveDate,
        events: &mut Vec<LifecycleEvent>,
    ) -> LifecycleState {
        let close = bar.close;

        if force_exit {
            self.finish_trade(pos, bar.timestamp, close, ExitReason::SessionEnd, session_date, events);
            return LifecycleState::Flat;
        }

        if close > pos.high_water_mark {
            pos.high_water_mark = close;
        }
        let trailing = &self.stops.trailing;
        if trailing.enabled {
            let proposed = pos.high_water_mark - trailing.trail_distance;
            if pos.trailing.is_active() {
                pos.trailing.apply(proposed);
            } else if pos.profit_per_unit(close) >= trailing.activation_profit {
                let level = pos.trailing.apply(proposed);
                debug!(timestamp = %bar.timestamp, level, "trailing stop activated");
                events.push(LifecycleEvent::TrailingActivated {
                    timestamp: bar.timestamp,
                    level,
                });
            }
        }

        if close <= pos.effective_stop() {
            let reason = match pos.trailing_stop() {
                Some(trail) if trail > pos.base_stop => ExitReason::TrailingStop,
                _ => ExitReason::BaseStop,
            };
            self.finish_trade(pos, bar.timestamp, close, reason, session_date, events);
            return LifecycleState::Flat;
        }

        let last = self.tiers.len() - 1;
        for i in 0..self.tiers.len() {
            if pos.tiers_filled[i] {
                continue;
            }
            let TakeProfitTier { distance, pct } = self.tiers[i];
            if !pos.tier_unlocked(i) || close < pos.entry_price + distance {
                break;
            }
            let quantity = if i == last {
                pos.remaining
            } else {
                (pos.quantity * pct / 100.0).min(pos.remaining)
            };
            let pnl = self.book_fill(&mut pos, bar.timestamp, close, quantity, Some(i + 1));
            pos.tiers_filled[i] = true;

            if i == last || pos.is_flat() {
                self.finish_trade(pos, bar.timestamp, close, ExitReason::Profit, session_date, events);
                return LifecycleState::Flat;
            }
            info!(
                timestamp = %bar.timestamp,
                tier = i + 1,
                price = close,
                quantity,
                pnl,
                "take-profit tier filled"
            );
            events.push(LifecycleEvent::PartialExit {
                timestamp: bar.timestamp,
                tier: i + 1,
                price: close,
                quantity,
                pnl,
            });
        }

        LifecycleState::Open(pos)
    }

    /// Close `quantity` at `price` and book the P&L into equity.
    fn book_fill(
        &mut self,
        pos: &mut Position,
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: f64,
        tier: Option<usize>,
    ) -> f64 {
        let pnl = (price - pos.entry_price) * quantity;
        pos.remaining -= quantity;
        if pos.remaining < QTY_EPSILON {
            pos.remaining = 0.0;
        }
        pos.realized_pnl += pnl;
        pos.fills.push(ExitFill {
            timestamp,
            price,
            quantity,
            pnl,
            tier,
        });
        self.equity += pnl;
        pnl
    }

    fn finish_trade(
        &mut self,
        mut pos: Position,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
        session_date: NaiveDate,
        events: &mut Vec<LifecycleEvent>,
    ) {
        if !pos.is_flat() {
            let remaining = pos.remaining;
            self.book_fill(&mut pos, timestamp, price, remaining, None);
        }
        let trade = TradeRecord {
            id: self.ids.next_trade_id(),
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_time: timestamp,
            exit_price: price,
            exit_reason: reason,
            quantity: pos.quantity,
            realized_pnl: pos.realized_pnl,
            fills: pos.fills,
        };
        self.reentry
            .record_exit(pos.entry_price, price, reason, session_date);
        info!(
            trade = %trade.id,
            timestamp = %timestamp,
            price,
            reason = %reason,
            pnl = trade.realized_pnl,
            equity = self.equity,
            "position closed"
        );
        self.trades.push(trade.clone());
        events.push(LifecycleEvent::FullExit { trade });
    }

    /// Close the open position outright. A no-op (with a warning) when flat.
    pub fn close_position(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
        session_date: NaiveDate,
    ) -> Option<LifecycleEvent> {
        match std::mem::replace(&mut self.state, LifecycleState::Flat) {
            LifecycleState::Open(pos) => {
                let mut events = Vec::with_capacity(1);
                self.finish_trade(pos, timestamp, price, reason, session_date, &mut events);
                events.pop()
            }
            other => {
                self.state = other;
                warn!(
                    timestamp = %timestamp,
                    reason = %reason,
                    "exit requested with no open position; ignored"
                );
                None
            }
        }
    }

    /// Drop a pending entry, if any.
    pub fn discard_pending(
        &mut self,
        timestamp: DateTime<Utc>,
        reason: &str,
    ) -> Option<LifecycleEvent> {
        match std::mem::replace(&mut self.state, LifecycleState::Flat) {
            LifecycleState::Pending(pending) => {
                debug!(timestamp = %timestamp, reason, "pending entry discarded");
                Some(LifecycleEvent::PendingDiscarded {
                    timestamp,
                    trigger_price: pending.trigger_price,
                    reason: reason.to_string(),
                })
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn initial_equity(&self) -> f64 {
        self.initial_equity
    }

    pub fn reentry(&self) -> &ReentryState {
        &self.reentry
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            LifecycleState::Open(pos) => Some(pos),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingEntry> {
        match &self.state {
            LifecycleState::Pending(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position().is_some()
    }
}
