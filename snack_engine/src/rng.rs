//! Random source for scripts (`set_variable` random, random moves).
//!
//! Not part of the save: a restored game draws from a fresh seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct GameRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `begin..=end`. Reversed bounds are swapped.
    pub fn range_inclusive(&mut self, begin: i64, end: i64) -> i64 {
        let (low, high) = if begin <= end {
            (begin, end)
        } else {
            (end, begin)
        };
        self.rng.gen_range(low..=high)
    }

    /// Index in `0..n`; 0 when `n` is 0.
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
