use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Builds the per-node RNG: `seed XOR node_index`, so every node gets an
/// independent, reproducible stream instead of sharing one RNG across
/// workers.
pub fn node_rng(seed: Option<u64>, node_index: u64) -> ChaCha8Rng {
    let base = seed.unwrap_or(0);
    ChaCha8Rng::seed_from_u64(base ^ node_index)
}
