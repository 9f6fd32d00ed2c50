//! Seeded randomness for deck shuffling and game id generation.
//!
//! A single `GameRng` is created at process start and handed to the
//! [`GameManager`](super::manager::GameManager). Tests construct one from a
//! fixed seed to get reproducible decks and ids.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Characters used for game ids.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a game id.
pub const GAME_ID_LEN: usize = 6;

/// Deterministic RNG wrapper.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create an RNG seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// The seed this RNG was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a random float in the given range.
    pub fn gen_range_f32(&mut self, range: std::ops::Range<f32>) -> f32 {
        self.inner.gen_range(range)
    }

    /// Shuffle a slice in place (Fisher-Yates, every permutation equally likely).
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Generate a random game id.
    pub fn game_id(&mut self) -> String {
        (0..GAME_ID_LEN)
            .map(|_| ID_ALPHABET[self.inner.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }
}
