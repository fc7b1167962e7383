//! Headless autoplayer used by the binary in place of a human.
//!
//! For every new piece it tries each rotation and column, scores the board the
//! drop would leave behind, then walks the piece there and hard drops after a
//! short think delay.

use lan_tetris_core::{Board, GameSession, Tetromino};
use lan_tetris_types::{GameAction, PieceKind, Rotation, BOARD_WIDTH, SPAWN_Y};

/// Where to put the current piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rotation: Rotation,
    pub x: i8,
}

/// Pick the best reachable placement for `kind` on `board`
pub fn plan(board: &Board, kind: PieceKind) -> Option<Placement> {
    let mut best: Option<(i32, Placement)> = None;

    for r in 0..4 {
        let rotation = Rotation::from_index(r);
        for x in -3..BOARD_WIDTH as i8 {
            if !board.can_place(kind, rotation, x, SPAWN_Y) {
                continue;
            }
            let mut y = SPAWN_Y;
            while board.can_place(kind, rotation, x, y + 1) {
                y += 1;
            }

            let mut after = board.clone();
            after.lock(kind, rotation, x, y);
            let lines = after.clear_lines();
            let score = evaluate(&after, lines);

            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, Placement { rotation, x }));
            }
        }
    }

    best.map(|(_, placement)| placement)
}

/// Higher is better: reward clears, punish height, holes and bumpiness
fn evaluate(board: &Board, lines: u32) -> i32 {
    let mut heights = [0i32; BOARD_WIDTH as usize];
    let mut holes = 0;

    for x in 0..BOARD_WIDTH as i8 {
        let mut seen_block = false;
        for y in 0..board.height() as i8 {
            if board.is_occupied(x, y) {
                if !seen_block {
                    heights[x as usize] = board.height() as i32 - y as i32;
                    seen_block = true;
                }
            } else if seen_block {
                holes += 1;
            }
        }
    }

    let aggregate: i32 = heights.iter().sum();
    let bumpiness: i32 = heights.windows(2).map(|w| (w[0] - w[1]).abs()).sum();

    lines as i32 * 76 - aggregate * 51 - holes * 36 - bumpiness * 18
}

/// Drives a session one placement at a time
#[derive(Debug, Clone)]
pub struct AutoPlayer {
    think_ms: u32,
    waited_ms: u32,
    current: Option<Tetromino>,
}

impl AutoPlayer {
    pub fn new(think_ms: u32) -> Self {
        Self {
            think_ms,
            waited_ms: 0,
            current: None,
        }
    }

    /// Advance the think timer and, once it runs out, place the active piece.
    ///
    /// Returns true when the piece was dropped.
    pub fn drive(&mut self, session: &mut GameSession, elapsed_ms: u32) -> bool {
        let Some(active) = session.active() else {
            return false;
        };

        // A different kind, or the piece jumped back up: a new piece spawned.
        let fresh = match self.current {
            None => true,
            Some(prev) => prev.kind != active.kind || active.y < prev.y,
        };
        if fresh {
            self.waited_ms = 0;
        }
        self.current = Some(active);

        self.waited_ms += elapsed_ms;
        if self.waited_ms < self.think_ms {
            return false;
        }

        if let Some(target) = plan(session.board(), active.kind) {
            for _ in 0..target.rotation.index() {
                session.apply_action(GameAction::RotateCw);
            }
            loop {
                let Some(piece) = session.active() else {
                    break;
                };
                let action = if piece.x > target.x {
                    GameAction::MoveLeft
                } else if piece.x < target.x {
                    GameAction::MoveRight
                } else {
                    break;
                };
                if !session.apply_action(action) {
                    break;
                }
            }
        }

        session.apply_action(GameAction::HardDrop);
        self.current = None;
        self.waited_ms = 0;
        true
    }
}
