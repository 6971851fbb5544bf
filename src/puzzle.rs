//! Debounced solve detection.
//!
//! ```text
//!            in tolerance              on target ≥ debounce
//!  Unsolved ─────────────▶ Armed(t) ───────────────────────▶ Solved(t')
//!      ▲                      │                                  │
//!      └──── off target ──────┘                                  │
//!      └─────────────────────── reset() ─────────────────────────┘
//! ```
//!
//! `Armed` is internal bookkeeping and is reported as unsolved. `Solved`
//! is sticky: only [`PuzzleMachine::reset`] leaves it.

use log::info;

use crate::compass::Angle;
use crate::config::TargetSpec;

/// Puzzle state. Timestamps are milliseconds since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PuzzleState {
    #[default]
    Unsolved,
    /// On target since `since_ms`, waiting out the debounce.
    Armed { since_ms: u64 },
    Solved { since_ms: u64 },
}

impl PuzzleState {
    pub fn is_solved(self) -> bool {
        matches!(self, Self::Solved { .. })
    }
}

/// Result of one [`PuzzleMachine::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuzzleUpdate {
    pub state: PuzzleState,
    /// True only on the tick that entered `Solved`.
    pub just_solved: bool,
}

pub struct PuzzleMachine {
    target: TargetSpec,
    debounce_ms: u64,
    state: PuzzleState,
}

impl PuzzleMachine {
    pub fn new(target: TargetSpec, debounce_ms: u64) -> Self {
        Self {
            target,
            debounce_ms,
            state: PuzzleState::Unsolved,
        }
    }

    /// Feed one angle sample taken at `now_ms`.
    pub fn update(&mut self, angle: Angle, now_ms: u64) -> PuzzleUpdate {
        let on_target = self.target.contains(angle);
        let mut just_solved = false;

        self.state = match self.state {
            solved @ PuzzleState::Solved { .. } => solved,
            PuzzleState::Unsolved if on_target => PuzzleState::Armed { since_ms: now_ms },
            PuzzleState::Armed { since_ms } if on_target => {
                let held_ms = now_ms.saturating_sub(since_ms);
                if held_ms >= self.debounce_ms {
                    info!("Puzzle solved at {}° after {} ms on target", angle, held_ms);
                    just_solved = true;
                    PuzzleState::Solved { since_ms: now_ms }
                } else {
                    PuzzleState::Armed { since_ms }
                }
            }
            PuzzleState::Unsolved | PuzzleState::Armed { .. } => PuzzleState::Unsolved,
        };

        PuzzleUpdate {
            state: self.state,
            just_solved,
        }
    }

    /// Force the puzzle back to unsolved, clearing any timers.
    pub fn reset(&mut self) {
        self.state = PuzzleState::Unsolved;
    }

    pub fn state(&self) -> PuzzleState {
        self.state
    }

    pub fn is_solved(&self) -> bool {
        self.state.is_solved()
    }

    pub fn target(&self) -> TargetSpec {
        self.target
    }
}
