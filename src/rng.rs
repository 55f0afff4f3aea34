use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// Seeded random source owned by a session so that a run can be replayed.
#[derive(Clone, Debug)]
pub struct Rng {
    inner: StdRng,
    seed: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for a child generator, e.g. one per life.
    pub fn next_seed(&mut self) -> u64 {
        self.inner.random()
    }

    /// Inclusive on both ends; returns `min` for an empty range.
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.inner.random_range(min..=max)
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.inner.random_range(0..len)
    }

    /// Weighted pick over `weights`; zero total falls back to index 0.
    pub fn pick_weighted(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return 0;
        }
        let mut roll = self.inner.random_range(0..total);
        for (idx, weight) in weights.iter().enumerate() {
            if roll < *weight {
                return idx;
            }
            roll -= weight;
        }
        weights.len() - 1
    }
}
