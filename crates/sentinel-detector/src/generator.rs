use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;

const BATCH_MEAN: f64 = 100.0;
const BATCH_STDEV: f64 = 20.0;
const ANOMALY_VALUE: f64 = 500.0;
const ANOMALY_PROBABILITY: f64 = 0.05;

/// One batch of synthetic packet sizes returned by `generate_traffic`.
#[derive(Debug, Clone)]
pub struct TrafficBatch {
    pub values: Vec<f64>,
    pub has_anomaly: bool,
    pub injected_indices: HashSet<usize>,
    /// Empty until scoring has occurred; the detection step fills this in.
    pub scores: Vec<f64>,
}

/// Draws `batch_size` packet sizes from `Normal(100, 20)`. With probability
/// 5% per batch, or unconditionally when `force_anomaly` is set, injects a
/// single `500.0` value at a random index. An empty batch short-circuits to
/// an empty, anomaly-free result.
pub fn generate_traffic(batch_size: usize, force_anomaly: bool, rng: &mut ChaCha8Rng) -> TrafficBatch {
    if batch_size == 0 {
        return TrafficBatch {
            values: Vec::new(),
            has_anomaly: false,
            injected_indices: HashSet::new(),
            scores: Vec::new(),
        };
    }

    let normal = Normal::new(BATCH_MEAN, BATCH_STDEV).expect("fixed, valid normal parameters");
    let mut values: Vec<f64> = (0..batch_size).map(|_| normal.sample(rng)).collect();

    let inject = force_anomaly || rng.gen_bool(ANOMALY_PROBABILITY);
    let mut injected_indices = HashSet::new();
    if inject {
        let idx = rng.gen_range(0..batch_size);
        values[idx] = ANOMALY_VALUE;
        injected_indices.insert(idx);
    }

    TrafficBatch {
        values,
        has_anomaly: inject,
        injected_indices,
        scores: Vec::new(),
    }
}
