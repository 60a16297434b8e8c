//! Signal evaluation: snapshot + configuration + re-entry memory → entry signal.
//!
//! The evaluator never touches position or equity state. It reads the
//! indicator snapshot, the current observation and the read-only
//! `ReentryState` the lifecycle manager keeps.
//!
//! Gates are applied in order and the first failing one becomes the reason:
//! 1. session (trading window, no-new-entry windows, forced-flatten window)
//! 2. warm-up
//! 3. re-entry eligibility
//! 4. AND of the per-indicator sub-conditions

pub mod conditions;
pub mod reentry;

pub use conditions::{entry_conditions, Condition};
pub use reentry::{check_reentry, ReentryDecision};

use crate::config::StrategyConfig;
use crate::domain::{Bar, ReentryState};
use crate::indicators::IndicatorSnapshot;
use crate::session::{SessionPhase, SessionPolicy};
use chrono::NaiveDate;
use serde::Serialize;

/// Result of evaluating one observation for entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySignal {
    pub fire: bool,
    pub reason: String,
    /// Close plus the configured entry buffer.
    pub trigger_price: f64,
}

impl EntrySignal {
    fn rejected(reason: impl Into<String>, trigger_price: f64) -> Self {
        Self {
            fire: false,
            reason: reason.into(),
            trigger_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    config: StrategyConfig,
    policy: SessionPolicy,
}

impl SignalEvaluator {
    pub fn new(config: StrategyConfig, policy: SessionPolicy) -> Self {
        Self { config, policy }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Evaluate the entry rules against the current observation.
    pub fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        bar: &Bar,
        reentry: &ReentryState,
        session_date: NaiveDate,
    ) -> EntrySignal {
        let trigger_price = bar.close + self.config.entry.entry_buffer;

        let phase = self.policy.phase(bar.timestamp);
        if phase != SessionPhase::Open {
            return EntrySignal::rejected(format!("no entry: {}", phase.as_str()), trigger_price);
        }

        if !snapshot.warm {
            return EntrySignal::rejected("no entry: indicators warming up", trigger_price);
        }

        let decision = check_reentry(
            &self.config.reentry,
            self.config.trend.enabled,
            snapshot,
            bar,
            reentry,
            session_date,
        );
        if let ReentryDecision::Blocked(reason) = decision {
            return EntrySignal::rejected(reason, trigger_price);
        }

        let conditions = entry_conditions(&self.config, snapshot, bar);
        let fire = conditions.iter().all(|c| c.passed);
        let reason = if fire {
            let parts: Vec<&str> = conditions.iter().map(|c| c.detail.as_str()).collect();
            if parts.is_empty() {
                "no filters enabled".to_string()
            } else {
                parts.join(" AND ")
            }
        } else {
            let failed: Vec<&str> = conditions
                .iter()
                .filter(|c| !c.passed)
                .map(|c| c.detail.as_str())
                .collect();
            format!("no entry: NOT ({})", failed.join(", "))
        };

        EntrySignal {
            fire,
            reason,
            trigger_price,
        }
    }

    /// True inside the forced-flatten window, regardless of indicators.
    pub fn should_force_exit(&self, bar: &Bar) -> bool {
        self.policy.in_flatten_window(bar.timestamp)
    }
}
