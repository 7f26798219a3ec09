use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Six-sided die with an owned RNG so rooms can be replayed from a seed.
#[derive(Debug)]
pub struct Dice {
    rng: ChaCha20Rng,
}

impl Dice {
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_rng(&mut rand::rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn roll(&mut self) -> u8 {
        self.rng.random_range(1..=6)
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::new()
    }
}
