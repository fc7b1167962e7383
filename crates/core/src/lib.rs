//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the per-player simulation: board mutation, placement
//! legality, lock delay, line clears and garbage. It has **no dependencies** on
//! rendering or networking; the relay in `lan-tetris-net` only ever sees the
//! serialized board string and the events a session emits.
//!
//! # Module Structure
//!
//! - [`board`]: 10x(20+2) grid with placement checks, line clearing, garbage and the board string
//! - [`pieces`]: Tetromino shape table and the rotation kick list
//! - [`rng`]: 7-bag random piece generation
//! - [`lock`]: Lock delay with a 15-move reset budget
//! - [`attack`]: Lines-to-garbage table and the inbound garbage counter
//! - [`session`]: One player's session tying the above together
//!
//! # Game Rules
//!
//! - **7-Bag Randomizer**: the next queue is topped up one whole bag at a time
//! - **Simple kicks**: every piece tries the same nine offsets after rotating
//! - **Lock Delay**: 650ms once grounded, with a budget of 15 moves that is never
//!   refilled while the same piece stays in play
//! - **Hold**: once per locked piece; the held piece re-enters at the spawn point
//! - **Garbage**: clearing 2/3/4 lines sends 1/2/4 rows; received rows wait for the next lock
//!
//! # Example
//!
//! ```
//! use lan_tetris_core::{GameSession, SessionEvent};
//! use lan_tetris_types::GameAction;
//!
//! let mut session = GameSession::new(12345);
//! session.apply_action(GameAction::MoveRight);
//! session.apply_action(GameAction::RotateCw);
//! session.apply_action(GameAction::HardDrop);
//!
//! // Advance one 60 FPS frame
//! session.tick(16);
//!
//! assert!(session.alive());
//! assert!(!session.take_events().contains(&SessionEvent::Died));
//! assert_eq!(session.board_string().len(), 200);
//! ```

pub mod attack;
pub mod board;
pub mod lock;
pub mod pieces;
pub mod rng;
pub mod session;

pub use lan_tetris_types as types;

// Re-export commonly used types for convenience
pub use attack::{attack_for_lines, PendingGarbage};
pub use board::Board;
pub use lock::{LockDecision, LockPhase, LockState};
pub use pieces::{get_shape, try_rotate};
pub use rng::{PieceQueue, SimpleRng};
pub use session::{GameSession, SessionEvent, Tetromino};
