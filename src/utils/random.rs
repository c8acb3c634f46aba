//! Seeded pseudo-random number generator.
//!
//! The temporal memory itself is deterministic and never draws random
//! numbers. `Random` exists to produce reproducible input streams for tests,
//! benchmarks and callers that want synthetic sequences.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A deterministic pseudo-random number generator.
///
/// # Example
///
/// ```rust
/// use veles::utils::Random;
///
/// let mut rng = Random::new(42);
/// let columns = rng.sample_active(100, 5);
/// assert_eq!(columns.len(), 100);
/// assert_eq!(columns.iter().filter(|&&b| b).count(), 5);
/// ```
#[derive(Clone)]
pub struct Random {
    rng: ChaCha20Rng,
    seed: u64,
}

impl Random {
    /// Creates a new generator with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed used for this generator.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates a random usize in the range [0, n).
    pub fn get_usize(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// Generates a random f64 in [0, 1).
    pub fn get_real64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Shuffles a slice in place using Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let n = slice.len();
        if n <= 1 {
            return;
        }

        for i in (1..n).rev() {
            let j = self.get_usize(i + 1);
            slice.swap(i, j);
        }
    }

    /// Samples `k` unique items without replacement.
    ///
    /// If `k >= items.len()`, returns a shuffled copy of all items.
    pub fn sample<T>(&mut self, mut items: Vec<T>, k: usize) -> Vec<T> {
        let n = items.len();
        if k >= n {
            self.shuffle(&mut items);
            return items;
        }

        // Partial Fisher-Yates
        for i in 0..k {
            let j = self.get_usize(n - i) + i;
            items.swap(i, j);
        }

        items.truncate(k);
        items
    }

    /// Returns a dense vector of length `n` with `k` distinct positions set.
    pub fn sample_active(&mut self, n: usize, k: usize) -> Vec<bool> {
        let mut bits = vec![false; n];
        for i in self.sample((0..n).collect(), k) {
            bits[i] = true;
        }
        bits
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for Random {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Random")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
