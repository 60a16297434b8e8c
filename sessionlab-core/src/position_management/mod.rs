/// Position management: lifecycle state machine + ratchet invariant
///
/// **Key Design Principles:**
/// 1. At most one position; equity is written only by the lifecycle
/// 2. **Ratchet invariant**: the trailing stop may tighten, never loosen
/// 3. Every state change is reported as a `LifecycleEvent`
///
/// **Module Structure:**
/// - `event`: lifecycle events (pending, entry, partial/full exit)
/// - `lifecycle`: FLAT → PENDING → OPEN → FLAT state machine
/// - `ratchet`: Ratchet state enforcement
/// - `sizing`: fixed-risk quantity calculation
pub mod event;
pub mod lifecycle;
pub mod ratchet;
pub mod sizing;

pub use event::LifecycleEvent;
pub use lifecycle::{LifecycleState, PendingEntry, PositionLifecycle};
pub use ratchet::RatchetState;
pub use sizing::RiskSizer;
