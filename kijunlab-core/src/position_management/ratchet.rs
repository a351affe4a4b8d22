/// Ratchet invariant enforcement
///
/// **Core Rule:** Stops may tighten, never loosen.
///
/// Breakeven and trailing both route through the ratchet, so a breakeven move
/// can never pull back a stop the trail has already raised past entry.
use crate::domain::PositionSide;
use serde::{Deserialize, Serialize};

/// Ratchet state for a position's stop.
///
/// - Long positions: stop can only rise
/// - Short positions: stop can only fall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatchetState {
    level: f64,
    side: PositionSide,
}

impl RatchetState {
    /// Create a ratchet at the initial stop level.
    pub fn with_initial_level(side: PositionSide, initial_level: f64) -> Self {
        Self {
            level: initial_level,
            side,
        }
    }

    /// Apply a proposed stop. Returns true if the stop tightened.
    ///
    /// # Example
    /// ```
    /// use kijunlab_core::domain::PositionSide;
    /// use kijunlab_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(PositionSide::Long, 95.0);
    ///
    /// // Tightening: $95 → $100 (allowed)
    /// assert!(ratchet.apply(100.0));
    /// assert_eq!(ratchet.level(), 100.0);
    ///
    /// // Loosening: $100 → $90 (blocked, stays at $100)
    /// assert!(!ratchet.apply(90.0));
    /// assert_eq!(ratchet.level(), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> bool {
        let tighter = match self.side {
            PositionSide::Long => proposed > self.level,
            PositionSide::Short => proposed < self.level,
        };
        if tighter {
            self.level = proposed;
        }
        tighter
    }

    /// Current stop level.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn side(&self) -> PositionSide {
        self.side
    }
}
