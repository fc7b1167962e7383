//! Session module - one player's simulation
//!
//! Ties together the board, the bag queue, the lock state machine and the garbage
//! counter. A session is owned by a single driver loop which feeds it actions and
//! elapsed time, then drains the events (attacks sent, death) it produced.

use crate::attack::{attack_for_lines, PendingGarbage};
use crate::lock::{LockDecision, LockState};
use crate::pieces::{get_shape, try_rotate};
use crate::rng::SimpleRng;
use crate::types::*;
use crate::{Board, PieceQueue};

/// Number of upcoming pieces exposed by [`GameSession::next_queue`]
pub const NEXT_PREVIEW: usize = 5;

/// Active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tetromino {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
}

impl Tetromino {
    /// Create a new tetromino at spawn position
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            rotation: Rotation::North,
            x: SPAWN_X,
            y: SPAWN_Y,
        }
    }

    /// Get the shape (mino offsets) for current rotation
    pub fn shape(&self) -> [(i8, i8); 4] {
        get_shape(self.kind, self.rotation)
    }

    /// Check if all minos are at valid positions on the board
    pub fn is_valid(&self, board: &Board) -> bool {
        board.can_place(self.kind, self.rotation, self.x, self.y)
    }

    /// Check if the piece is grounded (cannot move down one row)
    pub fn is_grounded(&self, board: &Board) -> bool {
        !board.can_place(self.kind, self.rotation, self.x, self.y + 1)
    }
}

/// Something the driver has to forward to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A lock cleared enough lines to send garbage
    Attack(u32),
    /// The session topped out
    Died,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    active: Option<Tetromino>,
    hold: Option<PieceKind>,
    can_hold: bool,
    piece_queue: PieceQueue,
    garbage_rng: SimpleRng,
    pending: PendingGarbage,
    lock: LockState,
    alive: bool,
    soft_drop: bool,
    shift: Option<Shift>,
    shift_timer_ms: u32,
    gravity_timer_ms: u32,
    elapsed_ms: u64,
    events: Vec<SessionEvent>,
}

impl GameSession {
    /// Create a session with an empty board and the first piece already spawned
    pub fn new(seed: u32) -> Self {
        let mut session = Self {
            board: Board::new(),
            active: None,
            hold: None,
            can_hold: true,
            piece_queue: PieceQueue::new(seed),
            // Holes use their own stream so garbage does not perturb the bag order.
            garbage_rng: SimpleRng::new(seed.rotate_left(16) ^ 0x9E37_79B9),
            pending: PendingGarbage::new(),
            lock: LockState::new(),
            alive: true,
            soft_drop: false,
            shift: None,
            shift_timer_ms: 0,
            gravity_timer_ms: 0,
            elapsed_ms: 0,
            events: Vec::new(),
        };
        session.spawn_next();
        session
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board access for scenario setup and tooling
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Visible board as sent over the wire
    pub fn board_string(&self) -> String {
        self.board.serialize()
    }

    pub fn active(&self) -> Option<Tetromino> {
        self.active
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn next_queue(&self) -> [PieceKind; NEXT_PREVIEW] {
        let mut next = [PieceKind::I; NEXT_PREVIEW];
        for (slot, kind) in next.iter_mut().zip(self.piece_queue.preview()) {
            *slot = kind;
        }
        next
    }

    pub fn pending_garbage(&self) -> u32 {
        self.pending.get()
    }

    pub fn lock_state(&self) -> &LockState {
        &self.lock
    }

    pub fn soft_drop(&self) -> bool {
        self.soft_drop
    }

    /// Milliseconds of play so far
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current gravity interval: 550ms, 2ms faster per second played, never below 120ms.
    /// Scaled down to 12% while soft drop is held.
    pub fn gravity_interval_ms(&self) -> u32 {
        let decay = (self.elapsed_ms / GRAVITY_DECAY_DIVISOR).min(u32::MAX as u64) as u32;
        let base = BASE_GRAVITY_MS.saturating_sub(decay).max(GRAVITY_FLOOR_MS);
        if self.soft_drop {
            base * SOFT_DROP_PERCENT / 100
        } else {
            base
        }
    }

    /// Take the events produced since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue garbage from an opponent; it lands on the next lock
    pub fn receive_garbage(&mut self, lines: u32) {
        if self.alive {
            self.pending.add(lines);
        }
    }

    pub fn set_soft_drop(&mut self, held: bool) {
        self.soft_drop = held;
    }

    /// Update the held horizontal key.
    ///
    /// A new direction moves once immediately and restarts the auto-repeat timer.
    pub fn set_shift(&mut self, shift: Option<Shift>) {
        if shift == self.shift {
            return;
        }
        self.shift = shift;
        self.shift_timer_ms = 0;
        if let Some(dir) = shift {
            self.try_move(dir.dx());
        }
    }

    /// Spawn the next piece from the queue, or top out if it does not fit
    fn spawn_next(&mut self) -> bool {
        let kind = self.piece_queue.draw();
        let piece = Tetromino::new(kind);
        if !piece.is_valid(&self.board) {
            self.top_out();
            return false;
        }

        self.active = Some(piece);
        self.can_hold = true;
        self.lock.reset();
        true
    }

    fn top_out(&mut self) {
        self.active = None;
        if self.alive {
            self.alive = false;
            self.events.push(SessionEvent::Died);
            log::debug!("session topped out after {}ms", self.elapsed_ms);
        }
    }

    fn is_grounded(&self) -> bool {
        self.active
            .map(|piece| piece.is_grounded(&self.board))
            .unwrap_or(false)
    }

    /// Move one column; spends a lock reset when it happened on the ground
    fn try_move(&mut self, dx: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let moved = Tetromino {
            x: active.x + dx,
            ..active
        };
        if !moved.is_valid(&self.board) {
            return false;
        }

        let grounded_before = self.is_grounded();
        self.active = Some(moved);
        let grounded_after = self.is_grounded();
        self.lock.register_action(grounded_before, grounded_after);
        true
    }

    fn try_rotate(&mut self, clockwise: bool) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let board = &self.board;
        let result = try_rotate(active.rotation, active.x, active.y, clockwise, |r, x, y| {
            board.can_place(active.kind, r, x, y)
        });

        let Some((rotation, (dx, dy))) = result else {
            return false;
        };

        let grounded_before = self.is_grounded();
        self.active = Some(Tetromino {
            rotation,
            x: active.x + dx,
            y: active.y + dy,
            ..active
        });
        let grounded_after = self.is_grounded();
        self.lock.register_action(grounded_before, grounded_after);
        true
    }

    /// Drop one row if there is room
    fn try_fall(&mut self) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let fallen = Tetromino {
            y: active.y + 1,
            ..active
        };
        if fallen.is_valid(&self.board) {
            self.active = Some(fallen);
            true
        } else {
            false
        }
    }

    /// Row the active piece would land on
    pub fn ghost_y(&self) -> Option<i8> {
        let active = self.active?;
        let mut y = active.y;
        while self.board.can_place(active.kind, active.rotation, active.x, y + 1) {
            y += 1;
        }
        Some(y)
    }

    fn hard_drop(&mut self) -> bool {
        let (Some(active), Some(y)) = (self.active, self.ghost_y()) else {
            return false;
        };
        self.active = Some(Tetromino { y, ..active });
        self.lock_and_spawn();
        true
    }

    /// Swap the active piece with the hold slot, once per lock
    fn hold(&mut self) -> bool {
        if !self.can_hold {
            return false;
        }
        let Some(active) = self.active else {
            return false;
        };

        self.can_hold = false;
        let incoming = match self.hold.replace(active.kind) {
            Some(kind) => kind,
            None => self.piece_queue.draw(),
        };

        let piece = Tetromino::new(incoming);
        if !piece.is_valid(&self.board) {
            self.top_out();
            return true;
        }
        self.active = Some(piece);
        self.lock.reset();
        true
    }

    /// Lock the active piece, clear lines, emit attack, apply pending garbage, spawn.
    fn lock_and_spawn(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        self.board
            .lock(active.kind, active.rotation, active.x, active.y);
        let cleared = self.board.clear_lines();

        let attack = attack_for_lines(cleared);
        if attack > 0 {
            self.events.push(SessionEvent::Attack(attack));
        }

        let garbage = self.pending.take();
        if garbage > 0 {
            self.board.add_garbage(garbage, &mut self.garbage_rng);
        }

        self.spawn_next();
    }

    /// Apply a game action
    ///
    /// Returns true when the action changed the session.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        if !self.alive {
            return false;
        }
        match action {
            GameAction::MoveLeft => self.try_move(-1),
            GameAction::MoveRight => self.try_move(1),
            GameAction::SoftDrop => self.try_fall(),
            GameAction::HardDrop => self.hard_drop(),
            GameAction::RotateCw => self.try_rotate(true),
            GameAction::RotateCcw => self.try_rotate(false),
            GameAction::Hold => self.hold(),
        }
    }

    /// Main tick - auto-shift, gravity, then the lock state machine.
    ///
    /// Returns true when a piece locked during this tick.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.alive || self.active.is_none() {
            return false;
        }
        self.elapsed_ms += elapsed_ms as u64;

        match self.shift {
            Some(dir) => {
                self.shift_timer_ms += elapsed_ms;
                if self.shift_timer_ms >= SHIFT_DELAY_MS {
                    self.try_move(dir.dx());
                    self.shift_timer_ms -= SHIFT_REPEAT_MS;
                }
            }
            None => self.shift_timer_ms = 0,
        }

        self.gravity_timer_ms += elapsed_ms;
        if self.gravity_timer_ms >= self.gravity_interval_ms() {
            self.gravity_timer_ms = 0;
            self.try_fall();
        }

        let grounded = self.is_grounded();
        match self.lock.advance(elapsed_ms, grounded) {
            LockDecision::Lock => {
                self.lock_and_spawn();
                true
            }
            LockDecision::Wait => false,
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(1)
    }
}
