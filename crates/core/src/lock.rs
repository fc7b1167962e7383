//! Lock delay with a bounded move-reset budget
//!
//! A piece gets its budget of 15 resets the first time it touches the ground.
//! Each successful move or rotation made while grounded (before or after the
//! action) spends one reset and restarts the lock timer. Lifting off the ground
//! pauses the timer but never restores the budget, so floating a piece with
//! kicks cannot stall the game forever.

use crate::types::{LOCK_DELAY_MS, LOCK_RESET_LIMIT};

/// Where the active piece stands with respect to the ground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    /// Has not touched the ground since it spawned
    Airborne,
    /// Resting on something; the lock timer runs
    Grounded,
    /// Touched ground earlier but is airborne again
    Lifted,
}

/// Outcome of advancing the machine by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
    Wait,
    Lock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockState {
    phase: LockPhase,
    lock_timer_ms: u32,
    moves_remaining: u8,
}

impl LockState {
    pub fn new() -> Self {
        Self {
            phase: LockPhase::Airborne,
            lock_timer_ms: 0,
            moves_remaining: LOCK_RESET_LIMIT,
        }
    }

    /// Back to a fresh piece (spawn or hold)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> LockPhase {
        self.phase
    }

    pub fn lock_timer_ms(&self) -> u32 {
        self.lock_timer_ms
    }

    pub fn moves_remaining(&self) -> u8 {
        self.moves_remaining
    }

    /// Advance by `elapsed_ms` given whether the piece is grounded right now.
    pub fn advance(&mut self, elapsed_ms: u32, grounded: bool) -> LockDecision {
        if grounded {
            if self.phase == LockPhase::Airborne {
                self.moves_remaining = LOCK_RESET_LIMIT;
                self.lock_timer_ms = 0;
            }
            self.phase = LockPhase::Grounded;
            self.lock_timer_ms = self.lock_timer_ms.saturating_add(elapsed_ms);

            if self.moves_remaining == 0 || self.lock_timer_ms >= LOCK_DELAY_MS {
                return LockDecision::Lock;
            }
        } else if self.phase != LockPhase::Airborne {
            self.phase = LockPhase::Lifted;
            self.lock_timer_ms = 0;
        }
        LockDecision::Wait
    }

    /// Account for a successful move or rotation.
    ///
    /// Returns true when a reset was spent.
    pub fn register_action(&mut self, grounded_before: bool, grounded_after: bool) -> bool {
        if self.phase == LockPhase::Airborne || !(grounded_before || grounded_after) {
            return false;
        }
        if self.moves_remaining == 0 {
            return false;
        }
        self.moves_remaining -= 1;
        self.lock_timer_ms = 0;
        true
    }
}

impl Default for LockState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airborne_piece_never_locks() {
        let mut lock = LockState::new();
        assert_eq!(lock.advance(10_000, false), LockDecision::Wait);
        assert_eq!(lock.phase(), LockPhase::Airborne);
        assert_eq!(lock.lock_timer_ms(), 0);
    }

    #[test]
    fn test_locks_after_delay_while_grounded() {
        let mut lock = LockState::new();
        assert_eq!(lock.advance(16, true), LockDecision::Wait);
        assert_eq!(lock.phase(), LockPhase::Grounded);
        assert_eq!(lock.advance(LOCK_DELAY_MS - 17, true), LockDecision::Wait);
        assert_eq!(lock.advance(1, true), LockDecision::Lock);
    }

    #[test]
    fn test_actions_before_touching_ground_are_free() {
        let mut lock = LockState::new();
        assert!(!lock.register_action(false, true));
        assert_eq!(lock.moves_remaining(), LOCK_RESET_LIMIT);
    }

    #[test]
    fn test_grounded_action_spends_reset_and_restarts_timer() {
        let mut lock = LockState::new();
        lock.advance(400, true);
        assert!(lock.register_action(true, true));
        assert_eq!(lock.moves_remaining(), LOCK_RESET_LIMIT - 1);
        assert_eq!(lock.lock_timer_ms(), 0);
    }

    #[test]
    fn test_action_airborne_both_sides_after_touch_is_free() {
        let mut lock = LockState::new();
        lock.advance(0, true);
        lock.advance(0, false);
        assert!(!lock.register_action(false, false));
        assert_eq!(lock.moves_remaining(), LOCK_RESET_LIMIT);
    }

    #[test]
    fn test_exhausted_budget_locks_on_next_grounded_tick() {
        let mut lock = LockState::new();
        lock.advance(0, true);
        for _ in 0..LOCK_RESET_LIMIT {
            assert!(lock.register_action(true, true));
        }
        assert_eq!(lock.moves_remaining(), 0);
        assert!(!lock.register_action(true, true));
        assert_eq!(lock.advance(0, true), LockDecision::Lock);
    }

    #[test]
    fn test_lift_pauses_timer_but_keeps_budget() {
        let mut lock = LockState::new();
        lock.advance(300, true);
        lock.register_action(true, false);
        lock.register_action(true, true);
        assert_eq!(lock.moves_remaining(), LOCK_RESET_LIMIT - 2);

        lock.advance(200, false);
        assert_eq!(lock.phase(), LockPhase::Lifted);
        assert_eq!(lock.lock_timer_ms(), 0);

        lock.advance(50, true);
        assert_eq!(lock.phase(), LockPhase::Grounded);
        assert_eq!(lock.moves_remaining(), LOCK_RESET_LIMIT - 2);
        assert_eq!(lock.lock_timer_ms(), 50);
    }

    #[test]
    fn test_reset_restores_airborne() {
        let mut lock = LockState::new();
        lock.advance(100, true);
        lock.register_action(true, true);
        lock.reset();
        assert_eq!(lock, LockState::new());
    }
}
