//! SessionLab Core: session-gated strategy evaluation over replayed or streamed prices.
//!
//! This crate contains one incremental evaluation core and two drivers:
//! - Domain types (bars, positions, trades, re-entry memory, ids)
//! - Validated run configuration (TOML) and the session clock policy
//! - Incremental indicator bank (EMA, RSI, VWAP, ATR, trend, momentum)
//! - Signal evaluator with session, warm-up and re-entry gates
//! - Position lifecycle with pending entries, tiered exits and dual stops
//! - `Engine::step`, shared by the replay driver and the stream driver

pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod position_management;
pub mod session;
pub mod signals;

pub use config::{ConfigError, RunConfig, SessionConfig, StrategyConfig};
pub use domain::{Bar, ExitReason, TradeRecord};
pub use engine::{Engine, EngineError, ReplayDriver, RunResult, StreamDriver};
