//! Bar-shape counters: consecutive up closes and the re-entry momentum window.

use crate::domain::Bar;
use std::collections::VecDeque;

/// Number of consecutive observations whose close exceeded the previous close.
#[derive(Debug, Clone, Default)]
pub struct ConsecutiveUp {
    prev_close: Option<f64>,
    count: usize,
}

impl ConsecutiveUp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bar: &Bar) -> usize {
        if bar.close.is_nan() {
            return self.count;
        }
        if let Some(prev) = self.prev_close.replace(bar.close) {
            if bar.close > prev {
                self.count += 1;
            } else {
                self.count = 0;
            }
        }
        self.count
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// The last `capacity` observations as (open, close) pairs.
///
/// The green count is maintained on push/evict so reads are O(1).
#[derive(Debug, Clone)]
pub struct RecentWindow {
    capacity: usize,
    bars: VecDeque<(f64, f64)>,
    green: usize,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bars: VecDeque::with_capacity(capacity),
            green: 0,
        }
    }

    pub fn update(&mut self, bar: &Bar) {
        if bar.open.is_nan() || bar.close.is_nan() || self.capacity == 0 {
            return;
        }
        if self.bars.len() == self.capacity {
            if let Some((open, close)) = self.bars.pop_front() {
                if close > open {
                    self.green -= 1;
                }
            }
        }
        if bar.is_green() {
            self.green += 1;
        }
        self.bars.push_back((bar.open, bar.close));
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.bars.len() == self.capacity
    }

    pub fn green_count(&self) -> usize {
        self.green
    }

    /// Last close minus first open across the window; 0 when empty.
    pub fn net_change(&self) -> f64 {
        match (self.bars.front(), self.bars.back()) {
            (Some(&(first_open, _)), Some(&(_, last_close))) => last_close - first_open,
            _ => 0.0,
        }
    }
}
