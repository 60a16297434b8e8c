/// Ratchet invariant enforcement
///
/// **Core Rule:** a trailing stop may tighten, never loosen.
///
/// Once the high-water mark pulls back, the proposed level
/// `high_water_mark - trail_distance` would drop; the ratchet keeps the
/// previous level instead.
use serde::{Deserialize, Serialize};

/// Ratchet state for a long position's trailing stop.
///
/// `current_level` is `None` until the first `apply`, which is how an
/// inactive trailing stop is represented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatchetState {
    current_level: Option<f64>,
}

impl RatchetState {
    /// Inactive ratchet for a long position.
    pub fn long() -> Self {
        Self::default()
    }

    /// Create a ratchet with an initial level
    pub fn with_initial_level(initial_level: f64) -> Self {
        Self {
            current_level: Some(initial_level),
        }
    }

    /// Apply ratchet to a proposed stop level
    ///
    /// Returns the ratcheted level: the max of the current and proposed
    /// levels. The first call initializes the level.
    ///
    /// # Example
    /// ```
    /// use sessionlab_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(95.0);
    ///
    /// // Tightening: $95 → $100 (allowed)
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    ///
    /// // Loosening: $100 → $90 (blocked, stays at $100)
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        let level = match self.current_level {
            None => proposed,
            Some(current) => current.max(proposed),
        };
        self.current_level = Some(level);
        level
    }

    /// Get current ratchet level (if active)
    pub fn current_level(&self) -> Option<f64> {
        self.current_level
    }

    pub fn is_active(&self) -> bool {
        self.current_level.is_some()
    }
}
