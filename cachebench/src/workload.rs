//! Deterministic synthetic workload generation.
//!
//! Every sample is a pure function of its seed: the same seed always
//! yields the same request, byte for byte, which is what makes benchmark
//! runs reproducible and the generator testable. The request mix is
//! read-heavy, and key and value lengths follow extreme-value (Gumbel)
//! distributions: most draws are small, with a long right tail. Draws
//! outside the configured bounds are rejected and retried.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::weighted::WeightedIndex;
use rand_distr::{Distribution, Gumbel};

use crate::config::Config;

/// Relative weights of the GET/SET/DEL draw, modelling read-heavy traffic.
const OP_WEIGHTS: [u32; 3] = [68, 17, 15];

/// Characters the key and value strings are drawn from.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Request types issued against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Probe a key.
    Get,
    /// Store a key/value pair.
    Set,
    /// Remove a key.
    Del,
}

/// One synthetic request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSample {
    /// The request type.
    pub op: Op,
    /// The key to address.
    pub key: String,
    /// The value to store; present only for [`Op::Set`].
    pub value: Option<String>,
}

/// Seeded generator for cache request samples.
#[derive(Debug, Clone)]
pub struct Workload {
    ops: WeightedIndex<u32>,
    key_len: Gumbel<f64>,
    val_len: Gumbel<f64>,
    key_bounds: (usize, usize),
    val_bounds: (usize, usize),
}

impl Workload {
    /// Builds a generator with the size bounds from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            ops: WeightedIndex::new(OP_WEIGHTS).unwrap(),
            key_len: Gumbel::new(30.0, 8.0).unwrap(),
            val_len: Gumbel::new(10.0, 50.0).unwrap(),
            key_bounds: (config.min_key_size, config.max_key_size),
            val_bounds: (config.min_val_size, config.max_val_size),
        }
    }

    /// Produces the sample for `seed`.
    pub fn sample(&self, seed: u64) -> WorkloadSample {
        let mut rng = SmallRng::seed_from_u64(seed);
        let op = match self.ops.sample(&mut rng) {
            0 => Op::Get,
            1 => Op::Set,
            _ => Op::Del,
        };

        let key = self.key(seed);
        let value = (op == Op::Set).then(|| self.value(seed));

        WorkloadSample { op, key, value }
    }

    /// The key/value pair for `seed`, for callers that issue a SET
    /// regardless of the drawn request type (warm-up does).
    pub fn set_sample(&self, seed: u64) -> (String, String) {
        (self.key(seed), self.value(seed))
    }

    fn key(&self, seed: u64) -> String {
        seeded_string(bounded_len(&self.key_len, self.key_bounds, seed))
    }

    fn value(&self, seed: u64) -> String {
        seeded_string(bounded_len(&self.val_len, self.val_bounds, seed))
    }
}

/// Rejection-samples `dist` from a seed-derived RNG until the draw lies
/// within `bounds`.
fn bounded_len(dist: &Gumbel<f64>, (min, max): (usize, usize), seed: u64) -> usize {
    let mut rng = SmallRng::seed_from_u64(seed);
    loop {
        let drawn = dist.sample(&mut rng);
        if drawn >= min as f64 && drawn <= max as f64 {
            return drawn as usize;
        }
    }
}

/// Builds the string of `length` characters. Position `i` draws from its
/// own RNG seeded with `length + i`, so every position is reproducible on
/// its own and the whole string could be generated in parallel.
fn seeded_string(length: usize) -> String {
    (0..length).map(|i| char_at((length + i) as u64)).collect()
}

fn char_at(seed: u64) -> char {
    let mut rng = SmallRng::seed_from_u64(seed);
    ALPHABET[rng.random_range(0..ALPHABET.len())] as char
}
