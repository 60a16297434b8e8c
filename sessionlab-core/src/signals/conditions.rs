//! Per-indicator entry sub-conditions.
//!
//! One condition per enabled indicator. A disabled indicator produces no
//! condition at all, which is the same as contributing `true` to the AND.

use crate::config::StrategyConfig;
use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;

/// One evaluated sub-condition with a human-readable description.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Condition {
    fn new(name: &'static str, passed: bool, detail: String) -> Self {
        Self {
            name,
            passed,
            detail,
        }
    }

    fn unavailable(name: &'static str) -> Self {
        Self::new(name, false, format!("{name} unavailable"))
    }
}

/// Evaluate every enabled sub-condition against the current observation.
pub fn entry_conditions(
    config: &StrategyConfig,
    snapshot: &IndicatorSnapshot,
    bar: &Bar,
) -> Vec<Condition> {
    let mut out = Vec::with_capacity(6);
    let close = bar.close;

    if config.ema.enabled {
        // State comparison on the current observation, not a cross event.
        out.push(match (snapshot.ema_fast, snapshot.ema_slow) {
            (Some(fast), Some(slow)) => Condition::new(
                "ema",
                fast > slow,
                format!("ema fast {fast:.2} > slow {slow:.2}"),
            ),
            _ => Condition::unavailable("ema"),
        });
    }

    if config.vwap.enabled {
        out.push(match snapshot.vwap {
            Some(vwap) => {
                Condition::new("vwap", close > vwap, format!("close {close:.2} > vwap {vwap:.2}"))
            }
            None => Condition::unavailable("vwap"),
        });
    }

    if config.rsi.enabled {
        let (lower, upper) = (config.rsi.lower, config.rsi.upper);
        out.push(match snapshot.rsi {
            Some(rsi) => Condition::new(
                "rsi",
                (lower..=upper).contains(&rsi),
                format!("rsi {rsi:.1} in [{lower}, {upper}]"),
            ),
            None => Condition::unavailable("rsi"),
        });
    }

    if config.atr.enabled {
        let (min, max) = (config.atr.min_atr, config.atr.max_atr);
        out.push(match snapshot.atr {
            Some(atr) => Condition::new(
                "atr",
                (min..=max).contains(&atr),
                format!("atr {atr:.2} in [{min}, {max}]"),
            ),
            None => Condition::unavailable("atr"),
        });
    }

    if config.trend.enabled {
        out.push(match snapshot.trend_ema {
            Some(trend) => Condition::new(
                "trend",
                snapshot.trend_up,
                format!("close {close:.2} > trend {trend:.2}"),
            ),
            None => Condition::unavailable("trend"),
        });
    }

    if config.momentum.enabled {
        let min = config.momentum.min_consecutive_up;
        out.push(Condition::new(
            "momentum",
            snapshot.consecutive_up >= min,
            format!("{} consecutive up >= {min}", snapshot.consecutive_up),
        ));
    }

    out
}
