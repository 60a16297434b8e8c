//! Evaluation engine: the single incremental step both drivers share.
//!
//! Per observation:
//! 1. ordering check (earlier than the previous observation → rejected)
//! 2. session rollover when the session date changes
//! 3. indicator bank advance
//! 4. signal evaluation and force-exit check
//! 5. position lifecycle apply
//!
//! Void observations stop after step 3: trackers hold their values and no
//! decision is taken.

pub mod replay;
pub mod result;
pub mod sink;
pub mod stream;

pub use replay::ReplayDriver;
pub use result::{max_drawdown, win_rate, DataWarning, RunResult, RunStats, WarningKind};
pub use sink::{NullSink, TradeSink};
pub use stream::{observation_channel, ObservationFeed, ObservationQueue, StopHandle, StreamDriver};

use crate::config::{ConfigError, RunConfig};
use crate::domain::{Bar, ConfigHash, ExitReason};
use crate::indicators::{IndicatorBank, IndicatorSnapshot};
use crate::position_management::{LifecycleEvent, PositionLifecycle};
use crate::session::SessionPolicy;
use crate::signals::{EntrySignal, SignalEvaluator};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("observation at {timestamp} is earlier than the previous one at {last}")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Everything one step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub snapshot: IndicatorSnapshot,
    /// `None` for void observations, which take no decisions.
    pub signal: Option<EntrySignal>,
    pub events: Vec<LifecycleEvent>,
}

pub struct Engine {
    config_hash: ConfigHash,
    policy: SessionPolicy,
    bank: IndicatorBank,
    evaluator: SignalEvaluator,
    lifecycle: PositionLifecycle,
    last_timestamp: Option<DateTime<Utc>>,
    /// Last non-void observation, used for end-of-data and rollover exits.
    last_close: Option<(DateTime<Utc>, f64)>,
    session_date: Option<NaiveDate>,
    observations: usize,
    warnings: Vec<DataWarning>,
    events: Vec<LifecycleEvent>,
    equity_curve: Vec<f64>,
}

impl Engine {
    /// Validate `config` and build every component from it.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let config_hash = config.fingerprint();
        let policy = SessionPolicy::new(config.session.clone());
        let bank = IndicatorBank::new(&config.strategy);
        let lifecycle = PositionLifecycle::new(&config.strategy, config.initial_equity);

        info!(
            config = config_hash.short(),
            trackers = ?bank.tracker_names(),
            warmup = bank.warmup_len(),
            timezone = %config.session.timezone,
            "engine initialised"
        );

        Ok(Self {
            config_hash,
            evaluator: SignalEvaluator::new(config.strategy, policy.clone()),
            policy,
            bank,
            lifecycle,
            last_timestamp: None,
            last_close: None,
            session_date: None,
            observations: 0,
            warnings: Vec::new(),
            events: Vec::new(),
            equity_curve: vec![config.initial_equity],
        })
    }

    /// Process one observation.
    ///
    /// An out-of-order observation is rejected without touching any state
    /// beyond the warning list.
    pub fn step(&mut self, bar: &Bar) -> Result<StepOutcome, EngineError> {
        if let Some(last) = self.last_timestamp {
            if bar.timestamp < last {
                let err = EngineError::OutOfOrder {
                    timestamp: bar.timestamp,
                    last,
                };
                warn!(%err, "observation rejected");
                self.warnings.push(DataWarning::new(
                    bar.timestamp,
                    WarningKind::OutOfOrder,
                    err.to_string(),
                ));
                return Err(err);
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        self.observations += 1;

        let date = self.policy.session_date(bar.timestamp);
        let mut events = Vec::new();
        if let Some(prev) = self.session_date.filter(|d| *d != date) {
            self.roll_session(prev, bar.timestamp, &mut events);
        }
        self.session_date = Some(date);

        let snapshot = self.bank.advance(bar, date);

        if bar.is_void() {
            self.warnings.push(DataWarning::new(
                bar.timestamp,
                WarningKind::VoidObservation,
                "NaN price field; no decision taken",
            ));
            self.record(&events);
            return Ok(StepOutcome {
                snapshot,
                signal: None,
                events,
            });
        }
        if !bar.is_sane() {
            warn!(timestamp = %bar.timestamp, ?bar, "inconsistent OHLC values");
            self.warnings.push(DataWarning::new(
                bar.timestamp,
                WarningKind::InsaneObservation,
                format!(
                    "inconsistent OHLC o={} h={} l={} c={} v={}",
                    bar.open, bar.high, bar.low, bar.close, bar.volume
                ),
            ));
        }

        let force_exit = self.evaluator.should_force_exit(bar);
        let signal = self
            .evaluator
            .evaluate(&snapshot, bar, self.lifecycle.reentry(), date);
        events.extend(
            self.lifecycle
                .apply(bar, &signal, &snapshot, force_exit, date),
        );
        self.last_close = Some((bar.timestamp, bar.close));
        self.record(&events);

        Ok(StepOutcome {
            snapshot,
            signal: Some(signal),
            events,
        })
    }

    /// A new session date arrived while the previous session still had a
    /// position or pending entry (the flatten window saw no observations).
    fn roll_session(
        &mut self,
        prev: NaiveDate,
        now: DateTime<Utc>,
        events: &mut Vec<LifecycleEvent>,
    ) {
        if self.lifecycle.has_position() {
            if let Some((ts, price)) = self.last_close {
                warn!(
                    session = %prev,
                    price,
                    "position survived its session; closing at the previous close"
                );
                events.extend(
                    self.lifecycle
                        .close_position(ts, price, ExitReason::SessionEnd, prev),
                );
            }
        }
        events.extend(self.lifecycle.discard_pending(now, "session rollover"));
    }

    /// End of input: close any open position at the last valid close,
    /// tagged `end of data`, and drop a pending entry.
    pub fn finish(&mut self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        if let Some((ts, price)) = self.last_close {
            if self.lifecycle.has_position() {
                let date = self
                    .session_date
                    .unwrap_or_else(|| self.policy.session_date(ts));
                events.extend(
                    self.lifecycle
                        .close_position(ts, price, ExitReason::EndOfData, date),
                );
            }
            events.extend(self.lifecycle.discard_pending(ts, "end of data"));
        }
        self.record(&events);
        events
    }

    fn record(&mut self, events: &[LifecycleEvent]) {
        let booked = events.iter().any(|e| {
            matches!(
                e,
                LifecycleEvent::PartialExit { .. } | LifecycleEvent::FullExit { .. }
            )
        });
        if booked {
            self.equity_curve.push(self.lifecycle.equity());
        }
        self.events.extend_from_slice(events);
    }

    /// Snapshot the run so far.
    pub fn result(&self, stopped: bool) -> RunResult {
        let trades = self.lifecycle.trades().to_vec();
        let stats = RunStats::from_results(
            self.lifecycle.initial_equity(),
            self.lifecycle.equity(),
            &trades,
            &self.equity_curve,
        );
        RunResult {
            config_hash: self.config_hash.clone(),
            observations: self.observations,
            trades,
            events: self.events.clone(),
            stats,
            warnings: self.warnings.clone(),
            open_position: self.lifecycle.position().cloned(),
            stopped,
        }
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    pub fn lifecycle(&self) -> &PositionLifecycle {
        &self.lifecycle
    }

    pub fn equity(&self) -> f64 {
        self.lifecycle.equity()
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }
}
