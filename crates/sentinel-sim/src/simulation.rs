use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentinel_consensus::SignatureMetrics;
use sentinel_core::{Result, SentinelError};
use sentinel_node::{Node, NodeConfig};
use sentinel_storage::{LedgerConfig, LedgerStore, SqliteLedger};

use crate::strategy::ExecutionStrategy;

/// Constructor/runtime tunables: the simulation-level knobs plus the
/// node- and ledger-level config each node/the ledger need.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub num_agents: usize,
    pub seed: Option<u64>,
    pub use_parallel_threshold: usize,
    pub stop_on_error: bool,
    pub node_config: NodeConfig,
    pub ledger_config: LedgerConfig,
    pub blacklist_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_agents: 100,
            seed: None,
            use_parallel_threshold: 50,
            stop_on_error: false,
            node_config: NodeConfig::default(),
            ledger_config: LedgerConfig::default(),
            blacklist_dir: PathBuf::from("blacklists"),
        }
    }
}

/// Snapshot returned by `Simulation::stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub step_count: u64,
    pub num_agents: usize,
    pub threshold: usize,
    pub use_parallel: bool,
    pub runtime: Duration,
    pub avg_step_time: Duration,
    pub ledger_size: usize,
}

/// Per-tick metrics the scheduler records for diagnostics and tests.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub step_index: u64,
    pub duration: Duration,
    pub ledger_size: usize,
    pub signatures_appended: usize,
    pub worker_errors: usize,
    pub signature_metrics: Vec<SignatureMetrics>,
}

/// Owns the node set and the ledger; drives the barriered phases of every
/// tick: fan-out act, fan-out validate, resolve consensus, fan-out
/// apply-accepted.
pub struct Simulation {
    ledger: Arc<dyn LedgerStore>,
    nodes: Vec<Node>,
    threshold: usize,
    strategy: ExecutionStrategy,
    stop_on_error: bool,
    step_count: u64,
    total_duration: Duration,
    closed: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.num_agents == 0 {
            return Err(SentinelError::configuration("numAgents must be > 0"));
        }

        let ledger: Arc<dyn LedgerStore> = Arc::new(SqliteLedger::open(config.ledger_config.clone())?);
        let threshold = config.num_agents / 2 + 1;
        let nodes = (0..config.num_agents)
            .map(|i| Node::new(i as u64, ledger.clone(), config.seed, config.node_config.clone(), &config.blacklist_dir))
            .collect();
        let strategy = ExecutionStrategy::choose(config.num_agents, config.seed, config.use_parallel_threshold);

        Ok(Self {
            ledger,
            nodes,
            threshold,
            strategy,
            stop_on_error: config.stop_on_error,
            step_count: 0,
            total_duration: Duration::ZERO,
            closed: false,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn num_agents(&self) -> usize {
        self.nodes.len()
    }

    /// Test/diagnostic accessor for a single node's validation cache.
    pub fn node_cache_stats(&self, index: usize) -> Option<sentinel_storage::CacheStats> {
        self.nodes.get(index).map(|n| n.cache_stats())
    }

    /// One simulation tick: fan-out the act phase, wait for every node to
    /// finish broadcasting, fan-out the validate phase, wait again, then
    /// resolve consensus and fan out `apply_accepted`. Every phase is a
    /// full barrier: `ExecutionStrategy::dispatch` does not return until
    /// every node has finished, so the validate phase never starts before
    /// every node has broadcast this tick, and consensus never runs
    /// against a partially-updated verdict set.
    pub fn step(&mut self) -> TickMetrics {
        let tick_start = Instant::now();

        let act_outcomes = self.strategy.dispatch(&mut self.nodes, |node| node.act());

        let mut signatures_appended = 0;
        let mut worker_errors = 0;
        for outcome in &act_outcomes {
            if outcome.signature_id.is_some() {
                signatures_appended += 1;
            }
            if outcome.errored {
                worker_errors += 1;
            }
        }

        let poll_outcomes = self.strategy.dispatch(&mut self.nodes, |node| node.poll_and_validate());

        let mut validations: HashMap<i64, Vec<bool>> = HashMap::new();
        for verdicts in &poll_outcomes {
            for verdict in verdicts {
                validations.entry(verdict.signature_id).or_default().push(verdict.is_valid);
            }
        }

        let outcome = sentinel_consensus::resolve(&validations, self.threshold, self.ledger.as_ref());

        if !outcome.accepted.is_empty() {
            let apply_errors: usize = self
                .strategy
                .dispatch(&mut self.nodes, |node| {
                    let mut errors = 0;
                    for sig in &outcome.accepted {
                        if let Err(e) = node.apply_accepted(sig) {
                            tracing::warn!(node_id = %node.id(), error = %e, "apply_accepted failed");
                            errors += 1;
                        }
                    }
                    errors
                })
                .into_iter()
                .sum();
            worker_errors += apply_errors;
        }

        let duration = tick_start.elapsed();
        self.step_count += 1;
        self.total_duration += duration;

        let ledger_size = self.ledger.len().unwrap_or(0);

        TickMetrics {
            step_index: self.step_count,
            duration,
            ledger_size,
            signatures_appended,
            worker_errors,
            signature_metrics: outcome.metrics,
        }
    }

    /// Runs `steps` ticks, logging progress at 10% intervals with an ETA.
    /// Aborts early with an error if `stop_on_error` is set and a tick
    /// produced any worker error.
    pub fn run(&mut self, steps: u64) -> Result<Vec<TickMetrics>> {
        if steps == 0 {
            return Err(SentinelError::configuration("steps must be > 0"));
        }

        let mut history = Vec::with_capacity(steps as usize);
        let overall_start = Instant::now();
        let progress_interval = (steps / 10).max(1);

        for i in 0..steps {
            let tick = self.step();

            if (i + 1) % progress_interval == 0 || i + 1 == steps {
                let elapsed = overall_start.elapsed();
                let avg = elapsed / (i + 1) as u32;
                let remaining = avg * (steps - (i + 1)) as u32;
                tracing::info!(
                    percent = (i + 1) * 100 / steps,
                    eta_secs = remaining.as_secs_f64(),
                    "simulation progress"
                );
            }

            let had_worker_error = tick.worker_errors > 0;
            history.push(tick);

            if self.stop_on_error && had_worker_error {
                return Err(SentinelError::fatal(format!("tick {} had worker errors with stop_on_error enabled", i + 1)));
            }
        }

        Ok(history)
    }

    pub fn stats(&self) -> Stats {
        let avg_step_time = if self.step_count > 0 {
            self.total_duration / self.step_count as u32
        } else {
            Duration::ZERO
        };
        Stats {
            step_count: self.step_count,
            num_agents: self.nodes.len(),
            threshold: self.threshold,
            use_parallel: self.strategy.is_parallel(),
            runtime: self.total_duration,
            avg_step_time,
            ledger_size: self.ledger.len().unwrap_or(0),
        }
    }

    /// Idempotent teardown. The worker pool and ledger connection pool are
    /// both released via `Drop` once their last `Arc`/owning value goes
    /// away; this method exists as the explicit, documented call site and
    /// to make repeated calls safe.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        tracing::info!(step_count = self.step_count, "simulation closed");
    }
}
