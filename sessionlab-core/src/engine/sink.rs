//! Trade sinks: where closed trades go as they complete.

use crate::domain::TradeRecord;
use crate::position_management::LifecycleEvent;
use crossbeam_channel::Sender;
use tracing::warn;

/// Receives each closed trade once, in close order. The engine never reads
/// from a sink.
pub trait TradeSink {
    fn on_trade(&mut self, trade: &TradeRecord);
}

impl TradeSink for Vec<TradeRecord> {
    fn on_trade(&mut self, trade: &TradeRecord) {
        self.push(trade.clone());
    }
}

impl TradeSink for Sender<TradeRecord> {
    fn on_trade(&mut self, trade: &TradeRecord) {
        if self.send(trade.clone()).is_err() {
            warn!(trade = %trade.id, "trade sink receiver dropped; trade not delivered");
        }
    }
}

impl<T: TradeSink + ?Sized> TradeSink for &mut T {
    fn on_trade(&mut self, trade: &TradeRecord) {
        (**self).on_trade(trade);
    }
}

/// Discards trades. For runs that only need the final `RunResult`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TradeSink for NullSink {
    fn on_trade(&mut self, _trade: &TradeRecord) {}
}

/// Forward every closed trade in `events` to `sink`.
pub(crate) fn forward_trades<S: TradeSink>(sink: &mut S, events: &[LifecycleEvent]) {
    for trade in events.iter().filter_map(LifecycleEvent::closed_trade) {
        sink.on_trade(trade);
    }
}
