use sentinel_sim::{Simulation, SimulationConfig};
use sentinel_storage::LedgerConfig;

fn config(num_agents: usize, seed: u64, dir: &tempfile::TempDir) -> SimulationConfig {
    SimulationConfig {
        num_agents,
        seed: Some(seed),
        use_parallel_threshold: 50,
        stop_on_error: false,
        ledger_config: LedgerConfig { path: dir.path().join("ledger.db").to_string_lossy().into_owned(), ..LedgerConfig::default() },
        blacklist_dir: dir.path().join("blacklists"),
        ..SimulationConfig::default()
    }
}

/// A basic run with 5 agents over 3 steps completes without error, ends
/// with a step count of 3, and settles on a threshold of 3.
#[test]
fn scenario_a_basic_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(config(5, 42, &dir)).unwrap();

    let history = sim.run(3).unwrap();

    assert_eq!(history.len(), 3);
    assert_eq!(sim.stats().step_count, 3);
    assert_eq!(sim.threshold(), 3);
    for tick in &history {
        assert_eq!(tick.worker_errors, 0);
    }
}

#[test]
fn num_agents_zero_is_rejected_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let result = Simulation::new(config(0, 1, &dir));
    assert!(result.is_err());
}

#[test]
fn run_zero_steps_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(config(5, 1, &dir)).unwrap();
    assert!(sim.run(0).is_err());
}

#[test]
fn threshold_is_majority_of_agent_count() {
    let dir = tempfile::tempdir().unwrap();
    let sim = Simulation::new(config(4, 1, &dir)).unwrap();
    assert_eq!(sim.threshold(), 3);
}

#[test]
fn same_seed_produces_same_step_count_and_threshold_across_runs() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let mut sim_a = Simulation::new(config(10, 7, &dir_a)).unwrap();
    let mut sim_b = Simulation::new(config(10, 7, &dir_b)).unwrap();

    sim_a.run(5).unwrap();
    sim_b.run(5).unwrap();

    assert_eq!(sim_a.stats().step_count, sim_b.stats().step_count);
    assert_eq!(sim_a.threshold(), sim_b.threshold());
}

#[test]
fn large_population_selects_worker_pool_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(config(60, 1, &dir)).unwrap();
    sim.run(1).unwrap();
    assert!(sim.stats().use_parallel);
}

#[test]
fn small_population_selects_sequential_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(config(5, 1, &dir)).unwrap();
    sim.run(1).unwrap();
    assert!(!sim.stats().use_parallel);
}

#[test]
fn close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(config(5, 1, &dir)).unwrap();
    sim.close();
    sim.close();
}
