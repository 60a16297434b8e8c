//! Run configuration: session bounds, indicator switches, stops, tiers, re-entry.
//!
//! Every field is required. There are no serde defaults: a config file that
//! omits a field fails to parse, and a parsed config that contradicts itself
//! fails `validate()`. The engine refuses to start on either.

use crate::domain::ConfigHash;
use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid session: {0}")]
    Session(String),

    #[error("invalid indicator settings: {0}")]
    Indicator(String),

    #[error("invalid stop settings: {0}")]
    Stop(String),

    #[error("invalid take-profit tiers: {0}")]
    TakeProfit(String),

    #[error("invalid entry settings: {0}")]
    Entry(String),

    #[error("invalid re-entry settings: {0}")]
    Reentry(String),
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub initial_equity: f64,
    pub session: SessionConfig,
    pub strategy: StrategyConfig,
}

/// Trading session bounds, in the exchange timezone.
///
/// - trading window: `[start + start_buffer, end - end_buffer)`
/// - forced-flatten window: from `end - end_buffer` onwards
/// - no-new-entry windows: the first `no_new_entry_start_minutes` and the
///   last `no_new_entry_end_minutes` of the trading window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub session_start: NaiveTime,
    pub session_end: NaiveTime,
    pub start_buffer_minutes: u32,
    pub end_buffer_minutes: u32,
    pub no_new_entry_start_minutes: u32,
    pub no_new_entry_end_minutes: u32,
    pub timezone: Tz,
}

/// Strategy rules. Frozen for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub ema: EmaCrossConfig,
    pub rsi: RsiConfig,
    pub vwap: VwapConfig,
    pub atr: AtrConfig,
    pub trend: TrendConfig,
    pub momentum: MomentumConfig,
    pub stops: StopConfig,
    pub take_profit: Vec<TakeProfitTier>,
    pub entry: EntryConfig,
    pub reentry: ReentryConfig,
}

/// Fast/slow EMA state comparison: fast above slow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmaCrossConfig {
    pub enabled: bool,
    pub fast_period: usize,
    pub slow_period: usize,
}

/// Oscillator must sit inside `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsiConfig {
    pub enabled: bool,
    pub period: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Close must be above the session VWAP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VwapConfig {
    pub enabled: bool,
}

/// Volatility must sit inside `[min_atr, max_atr]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtrConfig {
    pub enabled: bool,
    pub period: usize,
    pub min_atr: f64,
    pub max_atr: f64,
}

/// Close must be above a long-period trend EMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendConfig {
    pub enabled: bool,
    pub period: usize,
}

/// At least `min_consecutive_up` consecutive rising closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MomentumConfig {
    pub enabled: bool,
    pub min_consecutive_up: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    /// Base stop distance below entry, in price units. Also the sizing risk unit.
    pub fixed_stop_distance: f64,
    pub trailing: TrailingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrailingConfig {
    pub enabled: bool,
    /// Per-unit open profit required before the trailing stop arms.
    pub activation_profit: f64,
    /// Distance below the high-water mark.
    pub trail_distance: f64,
}

/// Close `pct` percent of the original quantity at `entry + distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TakeProfitTier {
    pub distance: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    /// Buy-stop offset above the signal close. Zero enters at the close.
    pub entry_buffer: f64,
    /// Percent of current equity risked per trade (1.0 = 1%).
    pub risk_per_trade_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReentryConfig {
    /// Close must exceed the last entry price by this much.
    pub price_buffer: f64,
    /// Number of recent observations inspected.
    pub lookback: usize,
    /// Minimum green (close > open) observations within `lookback`.
    pub min_green_bars: usize,
}

impl RunConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_equity > 0.0) {
            return Err(ConfigError::Entry(format!(
                "initial_equity must be > 0 (got {})",
                self.initial_equity
            )));
        }
        self.session.validate()?;
        self.strategy.validate()
    }

    /// Full hash: every parameter value. serde_json emits struct fields in
    /// declaration order, so the JSON is canonical.
    pub fn fingerprint(&self) -> ConfigHash {
        let json = serde_json::to_string(self).unwrap_or_default();
        ConfigHash::from_bytes(json.as_bytes())
    }
}

impl SessionConfig {
    pub fn start_secs(&self) -> i64 {
        i64::from(self.session_start.num_seconds_from_midnight())
    }

    pub fn end_secs(&self) -> i64 {
        i64::from(self.session_end.num_seconds_from_midnight())
    }

    /// First second of the trading window.
    pub fn trading_start_secs(&self) -> i64 {
        self.start_secs() + i64::from(self.start_buffer_minutes) * 60
    }

    /// First second of the forced-flatten window.
    pub fn flatten_start_secs(&self) -> i64 {
        self.end_secs() - i64::from(self.end_buffer_minutes) * 60
    }

    /// First second new entries are allowed.
    pub fn entry_open_secs(&self) -> i64 {
        self.trading_start_secs() + i64::from(self.no_new_entry_start_minutes) * 60
    }

    /// First second new entries are refused again.
    pub fn entry_close_secs(&self) -> i64 {
        self.flatten_start_secs() - i64::from(self.no_new_entry_end_minutes) * 60
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_start >= self.session_end {
            return Err(ConfigError::Session(format!(
                "session_start {} must be before session_end {} (overnight sessions are not supported)",
                self.session_start, self.session_end
            )));
        }
        if self.trading_start_secs() >= self.flatten_start_secs() {
            return Err(ConfigError::Session(format!(
                "start buffer ({}m) and end buffer ({}m) overlap",
                self.start_buffer_minutes, self.end_buffer_minutes
            )));
        }
        if self.entry_open_secs() >= self.entry_close_secs() {
            return Err(ConfigError::Session(format!(
                "no-new-entry windows ({}m start, {}m end) leave no time to enter",
                self.no_new_entry_start_minutes, self.no_new_entry_end_minutes
            )));
        }
        Ok(())
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_indicators()?;
        self.validate_stops()?;
        self.validate_tiers()?;

        if !(self.entry.entry_buffer >= 0.0) {
            return Err(ConfigError::Entry(format!(
                "entry_buffer must be >= 0 (got {})",
                self.entry.entry_buffer
            )));
        }
        let risk = self.entry.risk_per_trade_pct;
        if !(risk > 0.0 && risk <= 100.0) {
            return Err(ConfigError::Entry(format!(
                "risk_per_trade_pct must be in (0, 100] (got {risk})"
            )));
        }

        let r = &self.reentry;
        if r.lookback == 0 {
            return Err(ConfigError::Reentry("lookback must be >= 1".into()));
        }
        if r.min_green_bars > r.lookback {
            return Err(ConfigError::Reentry(format!(
                "min_green_bars ({}) exceeds lookback ({})",
                r.min_green_bars, r.lookback
            )));
        }
        if !(r.price_buffer >= 0.0) {
            return Err(ConfigError::Reentry(format!(
                "price_buffer must be >= 0 (got {})",
                r.price_buffer
            )));
        }
        Ok(())
    }

    fn validate_indicators(&self) -> Result<(), ConfigError> {
        let ema = &self.ema;
        if ema.enabled {
            if ema.fast_period == 0 {
                return Err(ConfigError::Indicator("ema fast_period must be >= 1".into()));
            }
            if ema.fast_period >= ema.slow_period {
                return Err(ConfigError::Indicator(format!(
                    "ema fast_period ({}) must be < slow_period ({})",
                    ema.fast_period, ema.slow_period
                )));
            }
        }

        let rsi = &self.rsi;
        if rsi.enabled {
            if rsi.period == 0 {
                return Err(ConfigError::Indicator("rsi period must be >= 1".into()));
            }
            if !(0.0..=100.0).contains(&rsi.lower)
                || !(0.0..=100.0).contains(&rsi.upper)
                || rsi.lower >= rsi.upper
            {
                return Err(ConfigError::Indicator(format!(
                    "rsi band [{}, {}] must satisfy 0 <= lower < upper <= 100",
                    rsi.lower, rsi.upper
                )));
            }
        }

        let atr = &self.atr;
        if atr.enabled {
            if atr.period == 0 {
                return Err(ConfigError::Indicator("atr period must be >= 1".into()));
            }
            if !(atr.min_atr >= 0.0) || !(atr.min_atr < atr.max_atr) {
                return Err(ConfigError::Indicator(format!(
                    "atr band [{}, {}] must satisfy 0 <= min < max",
                    atr.min_atr, atr.max_atr
                )));
            }
        }

        if self.trend.enabled && self.trend.period == 0 {
            return Err(ConfigError::Indicator("trend period must be >= 1".into()));
        }
        if self.momentum.enabled && self.momentum.min_consecutive_up == 0 {
            return Err(ConfigError::Indicator(
                "momentum min_consecutive_up must be >= 1".into(),
            ));
        }
        Ok(())
    }

    fn validate_stops(&self) -> Result<(), ConfigError> {
        let stops = &self.stops;
        if !(stops.fixed_stop_distance > 0.0) {
            return Err(ConfigError::Stop(format!(
                "fixed_stop_distance must be > 0 (got {})",
                stops.fixed_stop_distance
            )));
        }
        let trailing = &stops.trailing;
        if trailing.enabled {
            if !(trailing.trail_distance > 0.0) {
                return Err(ConfigError::Stop(format!(
                    "trail_distance must be > 0 (got {})",
                    trailing.trail_distance
                )));
            }
            if !(trailing.activation_profit >= 0.0) {
                return Err(ConfigError::Stop(format!(
                    "activation_profit must be >= 0 (got {})",
                    trailing.activation_profit
                )));
            }
        }
        Ok(())
    }

    fn validate_tiers(&self) -> Result<(), ConfigError> {
        let tiers = &self.take_profit;
        if tiers.is_empty() {
            return Err(ConfigError::TakeProfit("at least one tier is required".into()));
        }
        let mut prev_distance = 0.0;
        for (i, tier) in tiers.iter().enumerate() {
            if !(tier.distance > prev_distance) {
                return Err(ConfigError::TakeProfit(format!(
                    "tier {} distance {} must be > {} (distances strictly increasing and positive)",
                    i + 1,
                    tier.distance,
                    prev_distance
                )));
            }
            if !(tier.pct > 0.0 && tier.pct <= 100.0) {
                return Err(ConfigError::TakeProfit(format!(
                    "tier {} pct must be in (0, 100] (got {})",
                    i + 1,
                    tier.pct
                )));
            }
            prev_distance = tier.distance;
        }
        // The final tier always closes the remainder, so the earlier tiers
        // must leave something for it.
        let partial: f64 = tiers[..tiers.len() - 1].iter().map(|t| t.pct).sum();
        if partial >= 100.0 {
            return Err(ConfigError::TakeProfit(format!(
                "non-final tiers already close {partial}% of the position"
            )));
        }
        Ok(())
    }

    /// Largest warm-up requirement across enabled indicators.
    pub fn warmup_len(&self) -> usize {
        let mut n = 0;
        if self.ema.enabled {
            n = n.max(self.ema.slow_period);
        }
        if self.rsi.enabled {
            n = n.max(self.rsi.period + 1);
        }
        if self.atr.enabled {
            n = n.max(self.atr.period + 1);
        }
        if self.trend.enabled {
            n = n.max(self.trend.period);
        }
        n
    }
}
