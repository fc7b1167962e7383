//! Board module - manages the game grid
//!
//! The board is 10 columns by 22 rows: 2 hidden rows above a 20-row visible field.
//! Uses a flat array for better cache locality and zero-allocation.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..21 (top to bottom).
//!
//! Only the visible rows travel over the network, as a 200-char string: `.` for an
//! empty cell, the piece letter for a locked mino, `G` for garbage.

use crate::pieces::get_shape;
use crate::rng::SimpleRng;
use crate::types::{
    Cell, PieceKind, Rotation, Tile, BOARD_ROWS, BOARD_WIDTH, EMPTY_CHAR, HIDDEN_ROWS,
    VISIBLE_ROWS,
};

/// Total number of cells on the board
const BOARD_SIZE: usize = BOARD_WIDTH as usize * BOARD_ROWS as usize;

/// Number of cells in the visible region (and chars in a board string)
pub const VISIBLE_CELLS: usize = BOARD_WIDTH as usize * VISIBLE_ROWS as usize;

/// The game board - 10 columns x 22 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_ROWS as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    /// Total rows including the hidden spawn rows
    pub fn height(&self) -> u8 {
        BOARD_ROWS
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is valid (within bounds and empty)
    pub fn is_valid(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_ROWS as usize {
            return false;
        }
        let start = y * BOARD_WIDTH as usize;
        let end = start + BOARD_WIDTH as usize;
        self.cells[start..end].iter().all(|cell| cell.is_some())
    }

    /// Whether a piece fits at the given rotation and origin: every mino in
    /// bounds and on an empty cell.
    pub fn can_place(&self, kind: PieceKind, rotation: Rotation, x: i8, y: i8) -> bool {
        get_shape(kind, rotation)
            .iter()
            .all(|&(dx, dy)| self.is_valid(x + dx, y + dy))
    }

    /// Write a piece onto the board.
    ///
    /// Callers must have checked [`Board::can_place`] first.
    pub fn lock(&mut self, kind: PieceKind, rotation: Rotation, x: i8, y: i8) {
        debug_assert!(
            self.can_place(kind, rotation, x, y),
            "locking {:?} at ({}, {}) over occupied or out-of-bounds cells",
            kind,
            x,
            y
        );
        for (dx, dy) in get_shape(kind, rotation) {
            self.set(x + dx, y + dy, Some(Tile::Piece(kind)));
        }
    }

    /// Remove row `y` and shift every row above it down by one.
    /// The top row of the grid becomes empty.
    fn clear_row(&mut self, y: usize) {
        let width = BOARD_WIDTH as usize;

        // copy_within handles the overlapping ranges
        for row in (1..=y).rev() {
            let src_start = (row - 1) * width;
            self.cells
                .copy_within(src_start..src_start + width, row * width);
        }

        for cell in &mut self.cells[..width] {
            *cell = None;
        }
    }

    /// Clear every full visible row and return how many were removed.
    ///
    /// Rows are scanned top to bottom; after a removal the same index is
    /// checked again, since the row above has just moved into it.
    pub fn clear_lines(&mut self) -> u32 {
        let mut cleared = 0;
        let mut y = HIDDEN_ROWS as usize;
        while y < BOARD_ROWS as usize {
            if self.is_row_full(y) {
                self.clear_row(y);
                cleared += 1;
            } else {
                y += 1;
            }
        }
        cleared
    }

    /// Push one garbage row in at the bottom with its single hole at `hole`.
    /// The top row of the grid is discarded.
    pub fn push_garbage_row(&mut self, hole: usize) {
        let width = BOARD_WIDTH as usize;
        self.cells.copy_within(width.., 0);

        let bottom = BOARD_SIZE - width;
        for (x, cell) in self.cells[bottom..].iter_mut().enumerate() {
            *cell = if x == hole { None } else { Some(Tile::Garbage) };
        }
    }

    /// Insert `lines` garbage rows, each with an independently chosen hole.
    ///
    /// At most one grid's worth of rows is pushed; past that the board is all garbage anyway.
    pub fn add_garbage(&mut self, lines: u32, rng: &mut SimpleRng) {
        for _ in 0..lines.min(BOARD_ROWS as u32) {
            let hole = rng.next_range(BOARD_WIDTH as u32) as usize;
            self.push_garbage_row(hole);
        }
    }

    /// Visible region as a row-major string, one char per cell.
    pub fn serialize(&self) -> String {
        self.visible_cells()
            .iter()
            .map(|cell| match cell {
                Some(tile) => tile.as_char(),
                None => EMPTY_CHAR,
            })
            .collect()
    }

    /// Rebuild a board from a board string.
    ///
    /// Short input yields an empty board; extra chars past the visible region are
    /// ignored. The hidden rows always come back empty.
    pub fn deserialize(s: &str) -> Self {
        let mut board = Self::new();
        if s.chars().count() < VISIBLE_CELLS {
            return board;
        }

        let offset = HIDDEN_ROWS as usize * BOARD_WIDTH as usize;
        for (i, c) in s.chars().take(VISIBLE_CELLS).enumerate() {
            board.cells[offset + i] = if c == EMPTY_CHAR {
                None
            } else {
                Some(Tile::from_char(c))
            };
        }
        board
    }

    /// Cells of the 20 visible rows, row-major
    pub fn visible_cells(&self) -> &[Cell] {
        &self.cells[BOARD_SIZE - VISIBLE_CELLS..]
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells = [None; BOARD_SIZE];
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
