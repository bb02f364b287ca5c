use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::forest::Ensemble;

const DEFAULT_N_TREES: usize = 64;
const DEFAULT_SAMPLE_SIZE: usize = 256;

/// Wraps an isolation-forest-style ensemble behind a narrow contract:
/// `fit`, `score`, `anomaly_mask`. Callers — the simulation core — depend
/// only on this contract, so the ensemble implementation underneath is
/// free to change without touching `Node`.
pub struct AnomalyDetector {
    ensemble: Option<Ensemble>,
    rng: ChaCha8Rng,
    min_data_points: usize,
    n_trees: usize,
    sample_size: usize,
}

impl AnomalyDetector {
    pub fn new(seed: u64, min_data_points: usize) -> Self {
        Self {
            ensemble: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            min_data_points,
            n_trees: DEFAULT_N_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Trains on `sample`. Idempotent (refitting replaces the previous
    /// ensemble) and silently a no-op when `sample.len() < min_data_points`.
    pub fn fit(&mut self, sample: &[f64]) {
        if sample.len() < self.min_data_points {
            return;
        }
        self.ensemble = Some(Ensemble::build(sample, self.n_trees, self.sample_size, &mut self.rng));
    }

    /// Lower = more anomalous. Returns a neutral `0.0` for every point when
    /// the detector has not yet been fit, since an untrained detector has
    /// no basis to call anything anomalous.
    pub fn score(&self, sample: &[f64]) -> Vec<f64> {
        match &self.ensemble {
            Some(ensemble) => sample.iter().map(|&x| ensemble.score_one(x)).collect(),
            None => vec![0.0; sample.len()],
        }
    }

    /// Indices where `scores[i] < threshold`.
    pub fn anomaly_mask(scores: &[f64], threshold: f64) -> Vec<usize> {
        scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| s < threshold)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.ensemble.is_some()
    }
}
