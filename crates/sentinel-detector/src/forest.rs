use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A single randomized split tree over a 1-D sample. Internal, not part of
/// the public contract drawn around the detector — only
/// `fit`/`score`/`anomaly_mask` are exposed.
enum Node {
    Leaf { size: usize },
    Internal { split: f64, left: Box<Node>, right: Box<Node> },
}

fn average_path_length(size: usize) -> f64 {
    if size <= 1 {
        return 0.0;
    }
    let n = size as f64;
    2.0 * (harmonic(size - 1)) - (2.0 * (n - 1.0) / n)
}

fn harmonic(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    // Euler-Mascheroni approximation, standard for isolation-forest path
    // length normalization.
    (n as f64).ln() + 0.5772156649015329
}

fn build_tree(data: &[f64], depth: usize, max_depth: usize, rng: &mut ChaCha8Rng) -> Node {
    if data.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: data.len() };
    }
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(min < max) {
        return Node::Leaf { size: data.len() };
    }
    let split = rng.gen_range(min..max);
    let left: Vec<f64> = data.iter().cloned().filter(|&v| v < split).collect();
    let right: Vec<f64> = data.iter().cloned().filter(|&v| v >= split).collect();
    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size: data.len() };
    }
    Node::Internal {
        split,
        left: Box::new(build_tree(&left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, x: f64, depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + average_path_length(*size),
        Node::Internal { split, left, right } => {
            if x < *split {
                path_length(left, x, depth + 1.0)
            } else {
                path_length(right, x, depth + 1.0)
            }
        }
    }
}

/// An ensemble of randomized split trees over a 1-D sample, scored the way
/// the isolation-forest family does: shorter average path length across
/// the ensemble means more easily isolated, i.e. more anomalous.
pub(crate) struct Ensemble {
    trees: Vec<Node>,
    sample_size: usize,
}

impl Ensemble {
    pub fn build(sample: &[f64], n_trees: usize, sample_size: usize, rng: &mut ChaCha8Rng) -> Self {
        let effective_sample_size = sample_size.min(sample.len()).max(1);
        let max_depth = (effective_sample_size as f64).log2().ceil() as usize + 1;

        let trees = (0..n_trees)
            .map(|_| {
                let subsample: Vec<f64> = (0..effective_sample_size)
                    .map(|_| sample[rng.gen_range(0..sample.len())])
                    .collect();
                build_tree(&subsample, 0, max_depth, rng)
            })
            .collect();

        Self { trees, sample_size: effective_sample_size }
    }

    /// Normalized anomaly score in roughly [-0.5, 0.5]: negative values are
    /// more anomalous (shorter average path), matching the wrapper's
    /// "lower = more anomalous" contract and sklearn's `decision_function`
    /// sign convention, against which the default anomaly threshold of
    /// -0.05 is calibrated.
    pub fn score_one(&self, x: f64) -> f64 {
        let avg_path: f64 = self.trees.iter().map(|t| path_length(t, x, 0.0)).sum::<f64>() / self.trees.len() as f64;
        let c = average_path_length(self.sample_size);
        let s = if c > 0.0 { 2f64.powf(-avg_path / c) } else { 0.5 };
        0.5 - s
    }
}
