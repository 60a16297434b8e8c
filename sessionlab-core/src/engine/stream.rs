//! Stream driver: live observations through a bounded queue.
//!
//! Any number of producer threads hold an `ObservationFeed`; exactly one
//! `StreamDriver` owns the queue and the engine. The consumer blocks only on
//! the queue, waking every `poll_interval` to check its `StopHandle`.
//!
//! - every feed dropped: the run finishes like a replay (`end of data`)
//! - stop requested: the loop exits between observations and leaves any
//!   open position untouched; it is reported in `RunResult::open_position`

use super::sink::forward_trades;
use super::{Engine, RunResult, TradeSink};
use crate::domain::Bar;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long the consumer waits on an empty queue before re-checking the stop flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Producer handle. Clone one per producer thread.
#[derive(Debug, Clone)]
pub struct ObservationFeed {
    tx: Sender<Bar>,
}

impl ObservationFeed {
    /// Enqueue one observation, blocking while the queue is full.
    pub fn send(&self, bar: Bar) -> Result<(), SendError<Bar>> {
        self.tx.send(bar)
    }

    /// Normalize and enqueue a single tick.
    pub fn send_tick(
        &self,
        timestamp: chrono::DateTime<chrono::Utc>,
        price: f64,
        volume: f64,
    ) -> Result<(), SendError<Bar>> {
        self.tx.send(Bar::from_tick(timestamp, price, volume))
    }

    /// Observations queued and not yet taken by the consumer.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer end of the observation queue.
#[derive(Debug)]
pub struct ObservationQueue {
    rx: Receiver<Bar>,
}

impl ObservationQueue {
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Bounded single-consumer queue. `capacity` of zero makes every send a
/// rendezvous with the consumer.
pub fn observation_channel(capacity: usize) -> (ObservationFeed, ObservationQueue) {
    let (tx, rx) = bounded(capacity);
    (ObservationFeed { tx }, ObservationQueue { rx })
}

/// Cooperative stop flag, checked between observations.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

pub struct StreamDriver<S: TradeSink> {
    engine: Engine,
    queue: ObservationQueue,
    sink: S,
    stop: StopHandle,
    poll_interval: Duration,
}

impl<S: TradeSink> StreamDriver<S> {
    pub fn new(engine: Engine, queue: ObservationQueue, sink: S) -> Self {
        Self {
            engine,
            queue,
            sink,
            stop: StopHandle::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Handle for stopping this driver from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Consume until every producer is gone or a stop is requested.
    pub fn run(mut self) -> RunResult {
        loop {
            if self.stop.is_stopped() {
                let result = self.engine.result(true);
                info!(
                    observations = result.observations,
                    trades = result.stats.num_trades,
                    open_position = result.open_position.is_some(),
                    "stream stopped"
                );
                return result;
            }
            match self.queue.rx.recv_timeout(self.poll_interval) {
                Ok(bar) => self.process(&bar),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("all observation feeds dropped");
                    break;
                }
            }
        }

        let events = self.engine.finish();
        forward_trades(&mut self.sink, &events);
        let result = self.engine.result(false);
        info!(
            observations = result.observations,
            trades = result.stats.num_trades,
            final_equity = result.stats.final_equity,
            warnings = result.warnings.len(),
            "stream finished"
        );
        result
    }

    fn process(&mut self, bar: &Bar) {
        // Rejected observations are recorded as warnings; keep consuming.
        if let Ok(outcome) = self.engine.step(bar) {
            forward_trades(&mut self.sink, &outcome.events);
        }
    }
}
