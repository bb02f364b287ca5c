use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::ThreadPool;

/// The fan-out mechanism the scheduler dispatches node work through:
/// `dispatch(items, f) -> results`. Modeled as an enum rather than a
/// `dyn Trait` object since `dispatch` is generic over the per-item
/// closure and object safety would otherwise force boxing every call site;
/// the two branches are the sequential and worker-pool execution modes.
pub enum ExecutionStrategy {
    Sequential { activation_order: Vec<usize> },
    WorkerPool { pool: ThreadPool },
}

impl ExecutionStrategy {
    /// Chooses sequential-with-shuffled-order below `parallel_threshold`
    /// agents, a worker pool sized to `min(num_agents, available cores)`
    /// above it.
    pub fn choose(num_agents: usize, seed: Option<u64>, parallel_threshold: usize) -> Self {
        if num_agents > parallel_threshold {
            Self::worker_pool(num_agents)
        } else {
            Self::sequential(num_agents, seed)
        }
    }

    pub fn sequential(num_agents: usize, seed: Option<u64>) -> Self {
        let mut activation_order: Vec<usize> = (0..num_agents).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(0));
        activation_order.shuffle(&mut rng);
        Self::Sequential { activation_order }
    }

    pub fn worker_pool(num_agents: usize) -> Self {
        let threads = num_agents.min(num_cpus::get()).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build worker pool");
        Self::WorkerPool { pool }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::WorkerPool { .. })
    }

    /// Runs `f` once per element of `items`. For `Sequential`, items are
    /// activated in shuffled order (to avoid positional bias across ticks)
    /// but the returned `Vec` is always aligned to `items`' original
    /// order, so callers never need to know which strategy ran. For
    /// `WorkerPool`, `pool.install` + `par_iter_mut().collect()` is itself
    /// a full barrier: `dispatch` does not return until every item has
    /// been processed.
    pub fn dispatch<T, R, F>(&self, items: &mut [T], f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(&mut T) -> R + Sync,
    {
        match self {
            Self::Sequential { activation_order } => {
                let mut results: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
                for &i in activation_order {
                    if let Some(item) = items.get_mut(i) {
                        results[i] = Some(f(item));
                    }
                }
                results
                    .into_iter()
                    .map(|r| r.expect("activation_order covers every index exactly once"))
                    .collect()
            }
            Self::WorkerPool { pool } => pool.install(|| items.par_iter_mut().map(|item| f(item)).collect()),
        }
    }
}
