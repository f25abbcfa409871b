// Deterministic Seed - reproducible randomness for every probabilistic decision
// seed = sha256(fingerprint, difficulty); draws come from counter-addressed ChaCha streams

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chart::Difficulty;

/// Independent random stream per pipeline stage
///
/// Each stage gets its own ChaCha stream id so that adding or removing draws
/// in one stage never shifts the values another stage sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStage {
    Density = 1,
    Arrows = 2,
    Holds = 3,
}

/// Seed derived from the track's content fingerprint and the difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeterministicSeed(u64);

impl DeterministicSeed {
    /// Pure function of (fingerprint, difficulty)
    pub fn derive(fingerprint: &str, difficulty: Difficulty) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        hasher.update([0u8]);
        hasher.update(difficulty.as_str().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        DeterministicSeed(u64::from_le_bytes(bytes))
    }

    pub fn from_raw(value: u64) -> Self {
        DeterministicSeed(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Open the random stream for one stage
    pub fn stream(&self, stage: SeedStage) -> SeededStream {
        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        rng.set_stream(stage as u64);
        SeededStream { rng }
    }
}

/// Counter-addressed random source
///
/// `unit(counter)` depends only on (seed, stage, counter), never on how many
/// draws happened before, so call order cannot change a chart.
#[derive(Debug, Clone)]
pub struct SeededStream {
    rng: ChaCha8Rng,
}

impl SeededStream {
    /// Uniform draw in [0, 1) addressed by `counter`
    pub fn unit(&mut self, counter: u64) -> f64 {
        // Two 32-bit words per u64 draw
        self.rng.set_word_pos(u128::from(counter) * 2);
        let bits = self.rng.next_u64() >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}
