//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (simulation, relay, presentation glue).
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Visible height**: 20 rows
//! - **Hidden rows**: 2 rows above the visible field (spawn area)
//! - **Spawn position**: (3, 0) for every piece, rotation 0
//!
//! Rows are indexed 0-21 top to bottom; rows 0-1 are hidden.
//!
//! # Game Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `LOCK_DELAY_MS` | 650 | Time grounded before a piece locks |
//! | `LOCK_RESET_LIMIT` | 15 | Grounded moves/rotations allowed per piece |
//! | `BASE_GRAVITY_MS` | 550 | Gravity interval at the start of a match |
//! | `GRAVITY_FLOOR_MS` | 120 | Fastest gravity interval |
//! | `SHIFT_DELAY_MS` | 180 | Held shift delay before auto-repeat |
//! | `SHIFT_REPEAT_MS` | 85 | Auto-repeat interval |
//!
//! # Examples
//!
//! ```
//! use lan_tetris_types::{PieceKind, Rotation, Tile, BOARD_WIDTH, VISIBLE_ROWS};
//!
//! let piece = PieceKind::T;
//! assert_eq!(PieceKind::from_str("t"), Some(piece));
//! assert_eq!(Tile::Piece(piece).as_char(), 'T');
//!
//! assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
//! assert_eq!(Rotation::from_index(5), Rotation::East);
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(VISIBLE_ROWS, 20);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Rows shown to players and carried on the wire
pub const VISIBLE_ROWS: u8 = 20;

/// Rows above the visible field where pieces spawn
pub const HIDDEN_ROWS: u8 = 2;

/// Total rows held by a board
pub const BOARD_ROWS: u8 = VISIBLE_ROWS + HIDDEN_ROWS;

/// Spawn column of a piece origin
pub const SPAWN_X: i8 = 3;

/// Spawn row of a piece origin
pub const SPAWN_Y: i8 = 0;

/// Number of distinct pieces in one bag
pub const BAG_SIZE: usize = 7;

/// Lock delay when a piece is grounded (650ms)
pub const LOCK_DELAY_MS: u32 = 650;

/// Maximum number of grounded moves/rotations per piece (15)
pub const LOCK_RESET_LIMIT: u8 = 15;

/// Gravity interval at the start of a match
pub const BASE_GRAVITY_MS: u32 = 550;

/// Gravity never gets faster than this
pub const GRAVITY_FLOOR_MS: u32 = 120;

/// Gravity speeds up by 1ms for every this many elapsed milliseconds (2ms per second)
pub const GRAVITY_DECAY_DIVISOR: u64 = 500;

/// Soft drop scales the gravity interval to this percentage
pub const SOFT_DROP_PERCENT: u32 = 12;

/// Delay before a held shift starts repeating
pub const SHIFT_DELAY_MS: u32 = 180;

/// Interval between repeated shifts while held
pub const SHIFT_REPEAT_MS: u32 = 85;


/// The seven tetromino piece kinds
///
/// - **I**: horizontal bar
/// - **O**: 2x2 square
/// - **T**: T-shaped
/// - **S**: S-shaped
/// - **Z**: Z-shaped (mirror of S)
/// - **J**: J-shaped
/// - **L**: L-shaped (mirror of J)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// Every piece kind, in bag order before shuffling
    pub const ALL: [PieceKind; BAG_SIZE] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use lan_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }
}

/// Sentinel character for an empty cell in a serialized board
pub const EMPTY_CHAR: char = '.';

/// Character for a garbage cell in a serialized board
pub const GARBAGE_CHAR: char = 'G';

/// Content of a filled cell: a locked piece or garbage sent by an opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Piece(PieceKind),
    Garbage,
}

impl Tile {
    /// Board-string character for this tile
    pub fn as_char(&self) -> char {
        match self {
            Tile::Piece(PieceKind::I) => 'I',
            Tile::Piece(PieceKind::O) => 'O',
            Tile::Piece(PieceKind::T) => 'T',
            Tile::Piece(PieceKind::S) => 'S',
            Tile::Piece(PieceKind::Z) => 'Z',
            Tile::Piece(PieceKind::J) => 'J',
            Tile::Piece(PieceKind::L) => 'L',
            Tile::Garbage => GARBAGE_CHAR,
        }
    }

    /// Decode a non-empty board-string character.
    ///
    /// Characters that name no piece decode as garbage.
    pub fn from_char(c: char) -> Self {
        match c {
            'I' => Tile::Piece(PieceKind::I),
            'O' => Tile::Piece(PieceKind::O),
            'T' => Tile::Piece(PieceKind::T),
            'S' => Tile::Piece(PieceKind::S),
            'Z' => Tile::Piece(PieceKind::Z),
            'J' => Tile::Piece(PieceKind::J),
            'L' => Tile::Piece(PieceKind::L),
            _ => Tile::Garbage,
        }
    }
}

/// A cell on the game board
///
/// - `None`: Empty cell
/// - `Some(Tile)`: Cell filled by a piece or garbage
pub type Cell = Option<Tile>;

/// Rotation states, indexed 0-3
///
/// The rotation cycle goes: North → East → South → West → North
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Rotate clockwise (90°)
    pub fn rotate_cw(&self) -> Self {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }

    /// Rotate counter-clockwise (-90° or 270°)
    pub fn rotate_ccw(&self) -> Self {
        match self {
            Rotation::North => Rotation::West,
            Rotation::West => Rotation::South,
            Rotation::South => Rotation::East,
            Rotation::East => Rotation::North,
        }
    }

    /// Rotation index in 0..4
    pub fn index(&self) -> usize {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Rotation for an index, taken modulo 4
    pub fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }
}

/// Horizontal direction of a held shift key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Left,
    Right,
}

impl Shift {
    /// Column delta for one step
    pub fn dx(&self) -> i8 {
        match self {
            Shift::Left => -1,
            Shift::Right => 1,
        }
    }
}

/// Game actions that can be applied to a session
///
/// These actions are used by human input and by the headless autoplayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Drop piece one cell down
    SoftDrop,
    /// Instantly drop piece to lowest valid position and lock it
    HardDrop,
    /// Rotate piece 90° clockwise
    RotateCw,
    /// Rotate piece 90° counter-clockwise
    RotateCcw,
    /// Hold current piece (once per piece)
    Hold,
}

impl GameAction {
    /// Parse action from a camelCase string
    ///
    /// # Examples
    ///
    /// ```
    /// use lan_tetris_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::MoveLeft));
    /// assert_eq!(GameAction::from_str("hardDrop"), Some(GameAction::HardDrop));
    /// assert_eq!(GameAction::from_str("pause"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "softdrop" => Some(GameAction::SoftDrop),
            "harddrop" => Some(GameAction::HardDrop),
            "rotatecw" => Some(GameAction::RotateCw),
            "rotateccw" => Some(GameAction::RotateCcw),
            "hold" => Some(GameAction::Hold),
            _ => None,
        }
    }

    /// Convert to camelCase string
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::RotateCw => "rotateCw",
            GameAction::RotateCcw => "rotateCcw",
            GameAction::Hold => "hold",
        }
    }
}
