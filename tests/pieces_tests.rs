//! Piece table and rotation kicks against a real board

use lan_tetris::core::{get_shape, try_rotate, Board, PieceQueue};
use lan_tetris::core::pieces::ROTATION_KICKS;
use lan_tetris::types::{PieceKind, Rotation, Tile, BAG_SIZE};

#[test]
fn test_o_piece_ignores_rotation() {
    let north = get_shape(PieceKind::O, Rotation::North);
    for r in 0..4 {
        assert_eq!(get_shape(PieceKind::O, Rotation::from_index(r)), north);
    }
}

#[test]
fn test_rotation_without_obstacles_uses_no_kick() {
    let board = Board::new();
    let result = try_rotate(Rotation::North, 3, 5, true, |r, x, y| {
        board.can_place(PieceKind::T, r, x, y)
    });
    assert_eq!(result, Some((Rotation::East, (0, 0))));
}

#[test]
fn test_vertical_i_against_left_wall_kicks_right() {
    let board = Board::new();
    // East I sits in column x + 2, so x = -2 hugs the left wall.
    assert!(board.can_place(PieceKind::I, Rotation::East, -2, 5));

    let result = try_rotate(Rotation::East, -2, 5, true, |r, x, y| {
        board.can_place(PieceKind::I, r, x, y)
    });
    assert_eq!(result, Some((Rotation::South, (2, 0))));
}

#[test]
fn test_kick_can_lift_piece_off_the_stack() {
    let mut board = Board::new();
    // Floor the whole bottom row so the T cannot rotate in place at rest.
    for x in 0..10 {
        board.set(x, 21, Some(Tile::Garbage));
    }
    // North T resting on the stack: its flat side is row y + 2 = 20.
    assert!(board.can_place(PieceKind::T, Rotation::North, 3, 18));
    assert!(!board.can_place(PieceKind::T, Rotation::East, 3, 18));

    let (rotation, kick) = try_rotate(Rotation::North, 3, 18, true, |r, x, y| {
        board.can_place(PieceKind::T, r, x, y)
    })
    .unwrap();
    assert_eq!(rotation, Rotation::East);
    assert!(ROTATION_KICKS.contains(&kick));
    assert!(kick.1 < 0, "expected an upward kick, got {:?}", kick);
}

#[test]
fn test_blocked_rotation_reports_none() {
    let result = try_rotate(Rotation::South, 0, 0, false, |_, _, _| false);
    assert_eq!(result, None);
}

#[test]
fn test_each_bag_holds_every_piece_once() {
    let mut queue = PieceQueue::new(777);
    for _ in 0..4 {
        let mut bag: Vec<PieceKind> = (0..BAG_SIZE).map(|_| queue.draw()).collect();
        bag.sort_by_key(|k| k.as_str());
        let mut all = PieceKind::ALL.to_vec();
        all.sort_by_key(|k| k.as_str());
        assert_eq!(bag, all);
    }
}

#[test]
fn test_same_seed_same_sequence() {
    let mut a = PieceQueue::new(42);
    let mut b = PieceQueue::new(42);
    for _ in 0..30 {
        assert_eq!(a.draw(), b.draw());
    }
}
