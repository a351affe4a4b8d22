/// Position management: entry gates, layered exits, ratchet invariant
///
/// **Key Design Principles:**
/// 1. The state machine emits **orders and events**, never direct fills
/// 2. **Ratchet invariant**: stops may tighten, never loosen
/// 3. One position at a time; no re-entry on the bar that closes a position
///
/// **Module Structure:**
/// - `state_machine`: FLAT / OPEN transitions and per-bar management
/// - `ratchet`: Ratchet state enforcement
/// - `daily_counter`: Per-date entry cap
pub mod daily_counter;
pub mod ratchet;
pub mod state_machine;

pub use daily_counter::DailyCounter;
pub use ratchet::RatchetState;
pub use state_machine::{BarDecision, Phase, PositionStateMachine, StrategyRules};
