//! Pieces module - Tetromino shapes and the rotation kick list
//!
//! Each shape lives in a 4x4 box; offsets are (x, y) from the piece origin with
//! y growing downward. Rotation does not use SRS: every piece tries the same short
//! list of kick offsets, in order.

use crate::types::{PieceKind, Rotation};

/// Offset of a single mino relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

/// Kick offsets tried after computing the new rotation, first legal one wins.
pub const ROTATION_KICKS: [(i8, i8); 9] = [
    (0, 0),
    (-1, 0),
    (1, 0),
    (-2, 0),
    (2, 0),
    (0, -1),
    (-1, -1),
    (1, -1),
    (0, -2),
];

/// Get the shape (mino offsets) for a piece kind and rotation
pub fn get_shape(kind: PieceKind, rotation: Rotation) -> PieceShape {
    match kind {
        PieceKind::I => get_i_shape(rotation),
        PieceKind::O => get_o_shape(rotation),
        PieceKind::T => get_t_shape(rotation),
        PieceKind::S => get_s_shape(rotation),
        PieceKind::Z => get_z_shape(rotation),
        PieceKind::J => get_j_shape(rotation),
        PieceKind::L => get_l_shape(rotation),
    }
}

fn get_i_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 1), (1, 1), (2, 1), (3, 1)],
        Rotation::East => [(2, 0), (2, 1), (2, 2), (2, 3)],
        Rotation::South => [(0, 2), (1, 2), (2, 2), (3, 2)],
        Rotation::West => [(1, 0), (1, 1), (1, 2), (1, 3)],
    }
}

/// O piece shapes (same for all rotations)
fn get_o_shape(_rotation: Rotation) -> PieceShape {
    [(1, 1), (2, 1), (1, 2), (2, 2)]
}

fn get_t_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 1), (0, 2), (1, 2), (2, 2)],
        Rotation::East => [(1, 1), (1, 2), (2, 2), (1, 3)],
        Rotation::South => [(0, 2), (1, 2), (2, 2), (1, 3)],
        Rotation::West => [(1, 1), (0, 2), (1, 2), (1, 3)],
    }
}

fn get_s_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 1), (2, 1), (0, 2), (1, 2)],
        Rotation::East => [(1, 1), (1, 2), (2, 2), (2, 3)],
        Rotation::South => [(1, 2), (2, 2), (0, 3), (1, 3)],
        Rotation::West => [(0, 1), (0, 2), (1, 2), (1, 3)],
    }
}

fn get_z_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 1), (1, 1), (1, 2), (2, 2)],
        Rotation::East => [(2, 1), (1, 2), (2, 2), (1, 3)],
        Rotation::South => [(0, 2), (1, 2), (1, 3), (2, 3)],
        Rotation::West => [(1, 1), (0, 2), (1, 2), (0, 3)],
    }
}

fn get_j_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 1), (0, 2), (1, 2), (2, 2)],
        Rotation::East => [(1, 1), (2, 1), (1, 2), (1, 3)],
        Rotation::South => [(0, 2), (1, 2), (2, 2), (2, 3)],
        Rotation::West => [(1, 1), (1, 2), (0, 3), (1, 3)],
    }
}

fn get_l_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(2, 1), (0, 2), (1, 2), (2, 2)],
        Rotation::East => [(1, 1), (1, 2), (1, 3), (2, 3)],
        Rotation::South => [(0, 2), (1, 2), (2, 2), (0, 3)],
        Rotation::West => [(0, 1), (1, 1), (1, 2), (1, 3)],
    }
}

/// Try to rotate a piece, walking [`ROTATION_KICKS`] in order.
///
/// `can_place(rotation, x, y)` answers whether the piece fits at that rotation and
/// origin. Returns the new rotation and the kick that was applied, or `None` when no
/// candidate fits.
pub fn try_rotate<F>(
    rotation: Rotation,
    x: i8,
    y: i8,
    clockwise: bool,
    can_place: F,
) -> Option<(Rotation, (i8, i8))>
where
    F: Fn(Rotation, i8, i8) -> bool,
{
    let new_rotation = if clockwise {
        rotation.rotate_cw()
    } else {
        rotation.rotate_ccw()
    };

    ROTATION_KICKS
        .iter()
        .copied()
        .find(|&(dx, dy)| can_place(new_rotation, x + dx, y + dy))
        .map(|kick| (new_rotation, kick))
}
