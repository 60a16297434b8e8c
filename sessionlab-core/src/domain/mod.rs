//! Domain types for SessionLab

pub mod bar;
pub mod ids;
pub mod position;
pub mod reentry;
pub mod trade;

pub use bar::Bar;
pub use ids::{ConfigHash, IdGen, TradeId};
pub use position::{Position, QTY_EPSILON};
pub use reentry::ReentryState;
pub use trade::{ExitFill, ExitReason, TradeRecord};
