//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Chunk invariance: any chunking of a replay gives the same snapshots,
//!    events and trades
//! 2. Stop monotonicity: the effective stop of an open position never drops
//! 3. Tier ordering: tiers fill in ascending order and never overfill
//! 4. Session safety: no entry outside the entry window, no position held
//!    across a session boundary

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sessionlab_core::engine::{NullSink, ReplayDriver};
use sessionlab_core::position_management::LifecycleEvent;
use sessionlab_core::session::{SessionPhase, SessionPolicy};
use sessionlab_core::{Bar, Engine, RunConfig};

const CONFIG: &str = r#"
initial_equity = 50000.0

[session]
session_start = "09:00:00"
session_end = "17:00:00"
start_buffer_minutes = 5
end_buffer_minutes = 20
no_new_entry_start_minutes = 10
no_new_entry_end_minutes = 30
timezone = "Europe/London"

[strategy.ema]
enabled = true
fast_period = 3
slow_period = 6

[strategy.rsi]
enabled = true
period = 4
lower = 5.0
upper = 95.0

[strategy.vwap]
enabled = true

[strategy.atr]
enabled = true
period = 3
min_atr = 0.0
max_atr = 100.0

[strategy.trend]
enabled = true
period = 8

[strategy.momentum]
enabled = true
min_consecutive_up = 1

[strategy.stops]
fixed_stop_distance = 4.0

[strategy.stops.trailing]
enabled = true
activation_profit = 1.5
trail_distance = 2.0

[[strategy.take_profit]]
distance = 2.0
pct = 30.0

[[strategy.take_profit]]
distance = 4.0
pct = 30.0

[[strategy.take_profit]]
distance = 7.0
pct = 100.0

[strategy.entry]
entry_buffer = 0.25
risk_per_trade_pct = 2.0

[strategy.reentry]
price_buffer = 0.5
lookback = 3
min_green_bars = 1
"#;

fn config() -> RunConfig {
    RunConfig::from_toml_str(CONFIG).unwrap()
}

/// Every filter off: entries fire whenever the session allows, which keeps
/// the lifecycle busy.
fn busy_config() -> RunConfig {
    let mut config = config();
    let s = &mut config.strategy;
    s.ema.enabled = false;
    s.rsi.enabled = false;
    s.vwap.enabled = false;
    s.atr.enabled = false;
    s.trend.enabled = false;
    s.momentum.enabled = false;
    s.reentry.price_buffer = 0.0;
    s.reentry.min_green_bars = 0;
    config
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// (minutes since previous bar, close change, wick size)
fn arb_step() -> impl Strategy<Value = (i64, f64, f64)> {
    (1i64..45, -3.0..3.0_f64, 0.0..1.5_f64)
}

/// Random walk starting at 08:00 UTC on 2024-03-25, usually crossing
/// into the next London session.
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(arb_step(), 1..max_len).prop_map(|steps| {
        let mut ts: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 25, 8, 0, 0).unwrap();
        let mut close = 100.0_f64;
        steps
            .into_iter()
            .map(|(gap, change, wick)| {
                ts += Duration::minutes(gap);
                let open = close;
                close = (close + change).max(1.0);
                let high = open.max(close) + wick;
                let low = (open.min(close) - wick).max(0.5);
                Bar::new(ts, open, high, low, close, 100.0 + wick * 1000.0)
            })
            .collect()
    })
}

// ── 1. Chunk invariance ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Feeding the same sequence in arbitrary chunks is indistinguishable
    /// from feeding it in one call.
    #[test]
    fn chunking_does_not_change_results(
        bars in arb_bars(300),
        cuts in prop::collection::vec(0usize..300, 0..8),
    ) {
        let mut whole = ReplayDriver::new(Engine::new(config()).unwrap(), NullSink)
            .recording_snapshots();
        whole.feed(&bars);

        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(bars.len())).collect();
        cuts.sort_unstable();
        let mut chunked = ReplayDriver::new(Engine::new(config()).unwrap(), NullSink)
            .recording_snapshots();
        let mut start = 0;
        for cut in cuts.into_iter().chain(std::iter::once(bars.len())) {
            chunked.feed(&bars[start..cut]);
            start = cut;
        }

        prop_assert_eq!(whole.snapshots(), chunked.snapshots());
        let a = whole.finish();
        let b = chunked.finish();
        prop_assert_eq!(&a.events, &b.events);
        prop_assert_eq!(&a.trades, &b.trades);
        prop_assert_eq!(&a.stats, &b.stats);
    }
}

// ── 2. Stop monotonicity ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// While one position stays open, max(base, trailing) only rises.
    #[test]
    fn effective_stop_never_loosens(bars in arb_bars(200)) {
        let mut engine = Engine::new(busy_config()).unwrap();
        let mut prev: Option<(DateTime<Utc>, f64)> = None;
        for bar in &bars {
            engine.step(bar).unwrap();
            let current = engine
                .lifecycle()
                .position()
                .map(|p| (p.entry_time, p.effective_stop()));
            if let (Some((entry, before)), Some((same_entry, after))) = (prev, current) {
                if entry == same_entry {
                    prop_assert!(after >= before, "stop fell from {} to {}", before, after);
                }
            }
            prev = current;
        }
    }
}

// ── 3. Tier ordering ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Tier fills carry strictly increasing tier numbers, each at or above
    /// its own target, and the fills add up to exactly the entry quantity.
    #[test]
    fn tiers_fill_in_order_without_overfill(bars in arb_bars(200)) {
        let config = busy_config();
        let tiers = config.strategy.take_profit.clone();
        let result = ReplayDriver::new(Engine::new(config).unwrap(), NullSink).run(&bars);

        for trade in &result.trades {
            let mut last_tier = 0;
            for fill in &trade.fills {
                if let Some(tier) = fill.tier {
                    prop_assert!(tier > last_tier);
                    prop_assert!(fill.price >= trade.entry_price + tiers[tier - 1].distance - 1e-9);
                    last_tier = tier;
                }
            }
            let filled: f64 = trade.fills.iter().map(|f| f.quantity).sum();
            prop_assert!((filled - trade.quantity).abs() < 1e-6, "filled {} of {}", filled, trade.quantity);
        }

        for event in &result.events {
            if let LifecycleEvent::PartialExit { quantity, .. } = event {
                prop_assert!(*quantity > 0.0);
            }
        }
    }
}

// ── 4. Session safety ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn entries_and_positions_respect_sessions(bars in arb_bars(300)) {
        let config = busy_config();
        let policy = SessionPolicy::new(config.session.clone());
        let result = ReplayDriver::new(Engine::new(config).unwrap(), NullSink).run(&bars);

        for event in result.events.iter().filter(|e| e.is_entry()) {
            prop_assert_eq!(policy.phase(event.timestamp()), SessionPhase::Open);
        }
        for trade in &result.trades {
            prop_assert_eq!(
                policy.session_date(trade.entry_time),
                policy.session_date(trade.exit_time)
            );
            prop_assert!(trade.exit_time >= trade.entry_time);
        }
        prop_assert!(result.open_position.is_none());
    }
}
