//! Replay driver: a time-sorted historical sequence, fed in any chunking.
//!
//! `feed` may be called any number of times with contiguous chunks of the
//! sequence; the result is the same as one call with the whole sequence.

use super::sink::forward_trades;
use super::{Engine, RunResult, TradeSink};
use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;
use tracing::info;

pub struct ReplayDriver<S: TradeSink> {
    engine: Engine,
    sink: S,
    snapshots: Option<Vec<IndicatorSnapshot>>,
}

impl<S: TradeSink> ReplayDriver<S> {
    pub fn new(engine: Engine, sink: S) -> Self {
        Self {
            engine,
            sink,
            snapshots: None,
        }
    }

    /// Keep every indicator snapshot (for inspection and parity checks).
    pub fn recording_snapshots(mut self) -> Self {
        self.snapshots = Some(Vec::new());
        self
    }

    pub fn feed(&mut self, chunk: &[Bar]) {
        for bar in chunk {
            // Out-of-order observations are already recorded as warnings.
            let Ok(outcome) = self.engine.step(bar) else {
                continue;
            };
            forward_trades(&mut self.sink, &outcome.events);
            if let Some(snapshots) = self.snapshots.as_mut() {
                snapshots.push(outcome.snapshot);
            }
        }
    }

    /// Snapshots recorded so far; empty unless `recording_snapshots` was used.
    pub fn snapshots(&self) -> &[IndicatorSnapshot] {
        self.snapshots.as_deref().unwrap_or(&[])
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Close out at end of data and produce the run result.
    pub fn finish(mut self) -> RunResult {
        let events = self.engine.finish();
        forward_trades(&mut self.sink, &events);
        let result = self.engine.result(false);
        info!(
            observations = result.observations,
            trades = result.stats.num_trades,
            final_equity = result.stats.final_equity,
            warnings = result.warnings.len(),
            "replay finished"
        );
        result
    }

    /// Feed the whole sequence and finish.
    pub fn run(mut self, bars: &[Bar]) -> RunResult {
        self.feed(bars);
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::domain::TradeRecord;
    use crate::engine::NullSink;
    use chrono::{Duration, TimeZone, Utc};

    // Entries need warm trackers, so these tests only exercise plumbing; the
    // trading scenarios live in the integration tests.
    fn bars(n: usize) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 4, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.3).sin();
                Bar::new(base + Duration::minutes(i as i64), close, close + 0.5, close - 0.5, close, 500.0)
            })
            .collect()
    }

    #[test]
    fn chunked_feed_matches_single_feed() {
        let data = bars(120);
        let mut whole = ReplayDriver::new(Engine::new(sample_config()).unwrap(), NullSink)
            .recording_snapshots();
        whole.feed(&data);

        let mut chunked = ReplayDriver::new(Engine::new(sample_config()).unwrap(), NullSink)
            .recording_snapshots();
        for chunk in data.chunks(7) {
            chunked.feed(chunk);
        }
        assert_eq!(whole.snapshots(), chunked.snapshots());
        assert_eq!(whole.snapshots().len(), 120);
    }

    #[test]
    fn sink_receives_every_closed_trade() {
        let mut sink: Vec<TradeRecord> = Vec::new();
        let result = ReplayDriver::new(Engine::new(sample_config()).unwrap(), &mut sink).run(&bars(300));
        assert_eq!(sink, result.trades);
        for trade in &result.trades {
            let filled: f64 = trade.fills.iter().map(|f| f.quantity).sum();
            assert!((filled - trade.quantity).abs() < 1e-9, "{trade:?}");
        }
        assert!(!result.stopped);
        assert!(result.open_position.is_none());
    }
}
