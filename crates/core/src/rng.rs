//! RNG module - 7-bag random piece generation
//!
//! Each bag contains one of each piece (I, O, T, S, Z, J, L), shuffled.
//! The upcoming-piece queue is topped up one whole bag at a time whenever it
//! holds fewer than seven pieces, so a preview of at least six is always there.
//!
//! Also provides a simple LCG, seeded per session, for deterministic testing.

use std::collections::VecDeque;

use crate::types::{PieceKind, BAG_SIZE};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Uses the high bits; the low bits of an LCG cycle with a short period.
    pub fn next_range(&mut self, max: u32) -> u32 {
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// One freshly shuffled bag
pub fn new_bag(rng: &mut SimpleRng) -> [PieceKind; BAG_SIZE] {
    let mut bag = PieceKind::ALL;
    rng.shuffle(&mut bag);
    bag
}

/// Upcoming-piece queue fed by 7-bags
#[derive(Debug, Clone)]
pub struct PieceQueue {
    queue: VecDeque<PieceKind>,
    rng: SimpleRng,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed, primed with one bag
    pub fn new(seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let queue = new_bag(&mut rng).into_iter().collect();
        Self { queue, rng }
    }

    fn refill(&mut self) {
        while self.queue.len() < BAG_SIZE {
            let bag = new_bag(&mut self.rng);
            self.queue.extend(bag);
        }
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        self.refill();
        // refill() guarantees at least BAG_SIZE entries.
        self.queue.pop_front().unwrap_or(PieceKind::I)
    }

    /// Upcoming pieces in draw order
    pub fn preview(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.queue.iter().copied()
    }

    /// Peek at the next piece without removing it
    pub fn peek(&self) -> Option<PieceKind> {
        self.queue.front().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(54321);
        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_next_range_stays_in_bounds_and_covers_range() {
        let mut rng = SimpleRng::new(7);
        let mut seen = [false; 10];
        for _ in 0..1000 {
            let v = rng.next_range(10);
            assert!(v < 10);
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "every column should come up: {:?}", seen);
    }

    #[test]
    fn test_piece_queue_starts_with_one_bag() {
        let queue = PieceQueue::new(1);
        assert_eq!(queue.len(), BAG_SIZE);
        assert!(queue.peek().is_some());
    }

    #[test]
    fn test_every_bag_boundary_window_has_all_seven() {
        let mut queue = PieceQueue::new(99);
        for _ in 0..5 {
            let mut drawn: Vec<PieceKind> = (0..BAG_SIZE).map(|_| queue.draw()).collect();
            drawn.sort_by_key(|k| k.as_str());
            drawn.dedup();
            assert_eq!(drawn.len(), BAG_SIZE);
        }
    }

    #[test]
    fn test_queue_refills_a_whole_bag_when_short() {
        let mut queue = PieceQueue::new(3);
        queue.draw();
        // 6 left + a fresh bag of 7 = 13 after the refill, minus the draw.
        assert_eq!(queue.len(), BAG_SIZE - 1);
        queue.draw();
        assert_eq!(queue.len(), BAG_SIZE - 1 + BAG_SIZE - 1);
    }

    #[test]
    fn test_peek_matches_draw() {
        let mut queue = PieceQueue::new(1);
        for _ in 0..20 {
            let peeked = queue.peek();
            let drawn = queue.draw();
            assert_eq!(peeked, Some(drawn));
        }
    }
}
